//! Redirect guard and navigation seam.

use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};
use revu_flux::State;

use crate::config::RoutesConfig;

/// Bytes escaped in a `redirectTo` value. `/` stays literal so targets read
/// as paths; non-ASCII is always escaped.
const REDIRECT_VALUE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'<')
    .add(b'=')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Last navigation target, stored at `app/route`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppRoute(pub String);

impl State for AppRoute {
    const PATH: &'static str = "app/route";
}

/// Imperative router.
pub trait Navigator: Send + Sync {
    fn current_path(&self) -> String;
    fn navigate(&self, target: &str);
}

/// Decides where a given path must be redirected for an auth state.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    routes: RoutesConfig,
}

impl From<RoutesConfig> for RouteGuard {
    fn from(routes: RoutesConfig) -> Self {
        Self { routes }
    }
}

impl RouteGuard {
    /// `Some(target)` when `path` must not be shown in this auth state.
    ///
    /// - exempt routes: never redirected
    /// - signed in on a public-only route: its `redirectTo` target if it
    ///   is a local path, else the app root
    /// - anonymous on a protected route: login with `redirectTo=<path>`
    pub fn decide(&self, path: &str, authenticated: bool) -> Option<String> {
        let route = path.split(['?', '#']).next().unwrap_or(path);

        if self.is_exempt(route) {
            return None;
        }
        let public_only = matches_any(&self.routes.public_only, route);
        if authenticated {
            return public_only.then(|| {
                redirect_target(path).unwrap_or_else(|| self.routes.root.clone())
            });
        }
        if public_only || matches_any(&self.routes.public, route) {
            return None;
        }
        Some(format!(
            "{}?redirectTo={}",
            self.routes.login,
            utf8_percent_encode(path, REDIRECT_VALUE)
        ))
    }

    pub fn is_exempt(&self, path: &str) -> bool {
        matches_any(&self.routes.exempt, path)
    }

    pub fn routes(&self) -> &RoutesConfig {
        &self.routes
    }
}

fn matches_any(routes: &[String], path: &str) -> bool {
    routes.iter().any(|r| matches_route(r, path))
}

fn matches_route(route: &str, path: &str) -> bool {
    let route = route.trim_end_matches('/');
    if route.is_empty() {
        return path == "/" || path.is_empty();
    }
    match path.strip_prefix(route) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

/// The `redirectTo` query value of `path`, if it names a local path.
fn redirect_target(path: &str) -> Option<String> {
    let (_, query) = path.split_once('?')?;
    let query = query.split('#').next().unwrap_or(query);
    let raw = query
        .split('&')
        .find_map(|pair| pair.strip_prefix("redirectTo="))?;
    let target = percent_decode_str(raw).decode_utf8().ok()?;
    (target.starts_with('/') && !target.starts_with("//")).then(|| target.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> RouteGuard {
        RouteGuard::from(RoutesConfig::default())
    }

    #[test]
    fn anonymous_on_protected_goes_to_login() {
        assert_eq!(
            guard().decide("/dashboard", false).as_deref(),
            Some("/login?redirectTo=/dashboard")
        );
    }

    #[test]
    fn authenticated_on_login_goes_to_root() {
        assert_eq!(guard().decide("/login", true).as_deref(), Some("/"));
        assert_eq!(guard().decide("/signup?ref=x", true).as_deref(), Some("/"));
    }

    #[test]
    fn allowed_combinations_stay() {
        let g = guard();
        assert_eq!(g.decide("/dashboard", true), None);
        assert_eq!(g.decide("/login", false), None);
        assert_eq!(g.decide("/forgot-password", false), None);
    }

    #[test]
    fn exempt_route_is_never_redirected() {
        let g = guard();
        assert_eq!(g.decide("/reset-password?token=abc", false), None);
        assert_eq!(g.decide("/reset-password", true), None);
    }

    #[test]
    fn prefix_matches_on_segment_boundary() {
        let g = guard();
        assert!(g.decide("/login/callback", true).is_some());
        assert_eq!(
            g.decide("/loginx", false).as_deref(),
            Some("/login?redirectTo=/loginx")
        );
    }

    #[test]
    fn root_is_protected_by_default() {
        assert_eq!(
            guard().decide("/", false).as_deref(),
            Some("/login?redirectTo=/")
        );
    }

    #[test]
    fn public_routes_open_to_both() {
        let mut routes = RoutesConfig::default();
        routes.public.push("/about".into());
        let g = RouteGuard::from(routes);
        assert_eq!(g.decide("/about", false), None);
        assert_eq!(g.decide("/about/team", true), None);
    }

    #[test]
    fn signed_in_login_honors_redirect_to() {
        let g = guard();
        assert_eq!(
            g.decide("/login?redirectTo=/batches%3Fid%3D7", true).as_deref(),
            Some("/batches?id=7")
        );
        assert_eq!(
            g.decide("/login?redirectTo=//evil.example", true).as_deref(),
            Some("/")
        );
        assert_eq!(
            g.decide("/login?redirectTo=https://evil.example", true).as_deref(),
            Some("/")
        );
    }

    #[test]
    fn redirect_value_escapes_unsafe_bytes() {
        let target = guard().decide("/artículos/a\tb\"<x>", false).unwrap();
        assert_eq!(
            target,
            "/login?redirectTo=/art%C3%ADculos/a%09b%22%3Cx%3E"
        );
        assert!(target.is_ascii());
    }

    #[test]
    fn escaped_redirect_round_trips() {
        let g = guard();
        let login = g.decide("/artículos?q=a b", false).unwrap();
        assert_eq!(g.decide(&login, true).as_deref(), Some("/artículos?q=a b"));
    }

    #[test]
    fn undecodable_redirect_falls_back_to_root() {
        assert_eq!(
            guard().decide("/login?redirectTo=/%FF", true).as_deref(),
            Some("/")
        );
    }

    #[test]
    fn redirect_target_keeps_query() {
        assert_eq!(
            guard().decide("/batches?id=7&tab=open", false).as_deref(),
            Some("/login?redirectTo=/batches%3Fid%3D7%26tab%3Dopen")
        );
    }
}
