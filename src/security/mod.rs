//! Form-login security: who the caller is and what they may reach.
//!
//! - `ant_matcher`: Ant-style URL patterns
//! - `policy`: ordered (pattern, access) rules, first match wins
//! - `principal`: the authenticated identity attached to a request
//! - `user_details`: credential lookup seam and an in-memory implementation
//! - `password`: `{id}`-prefixed password verification
//! - `authentication`: username/password check producing a principal
//! - `session`: principal persistence in a private cookie

pub mod ant_matcher;
pub mod authentication;
pub mod password;
pub mod policy;
pub mod principal;
pub mod session;
pub mod user_details;

pub use ant_matcher::AntMatcher;
pub use authentication::{AuthenticationError, AuthenticationManager};
pub use password::DelegatingPasswordEncoder;
pub use policy::{Access, AuthorizationPolicy, Decision};
pub use principal::Principal;
pub use user_details::{InMemoryUserDetailsService, UserDetails, UserDetailsService};

/// Paths wired into the login/logout flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormLogin {
    pub login_page: String,
    pub login_processing_url: String,
    pub logout_url: String,
    pub access_denied_page: String,
    pub default_success_url: String,
}

impl Default for FormLogin {
    fn default() -> Self {
        Self {
            login_page: "/showMyLoginPage".to_string(),
            login_processing_url: "/authenticateTheUser".to_string(),
            logout_url: "/logout".to_string(),
            access_denied_page: "/access-denied".to_string(),
            default_success_url: "/".to_string(),
        }
    }
}

impl FormLogin {
    pub fn failure_url(&self) -> String {
        format!("{}?error", self.login_page)
    }

    pub fn logout_success_url(&self) -> String {
        format!("{}?logout", self.login_page)
    }

    /// Paths reachable by anyone, whatever the rule table says.
    pub fn permitted_paths(&self) -> [&str; 4] {
        [
            self.login_page.as_str(),
            self.login_processing_url.as_str(),
            self.logout_url.as_str(),
            self.access_denied_page.as_str(),
        ]
    }
}
