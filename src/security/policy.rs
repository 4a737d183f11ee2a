//! Ordered URL authorization rules.
//!
//! Rules are evaluated in declaration order and the first matching pattern
//! decides. A path that matches nothing falls through to the default access.

use crate::security::FormLogin;
use crate::security::ant_matcher::AntMatcher;
use crate::security::principal::Principal;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    PermitAll,
    HasRole(String),
    Authenticated,
    DenyAll,
}

impl Access {
    pub fn is_granted(&self, principal: Option<&Principal>) -> bool {
        match self {
            Access::PermitAll => true,
            Access::HasRole(role) => principal.is_some_and(|p| p.has_role(role)),
            Access::Authenticated => principal.is_some(),
            Access::DenyAll => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// Authenticated but lacking the required role.
    Deny,
    /// Anonymous and the path is not open to anonymous callers.
    RequireLogin,
}

#[derive(Debug, Clone)]
pub struct AuthorizationRule {
    pub matcher: AntMatcher,
    pub access: Access,
}

#[derive(Debug, Clone)]
pub struct AuthorizationPolicy {
    rules: Vec<AuthorizationRule>,
    default_access: Access,
}

#[derive(Debug, Clone)]
pub struct PolicyBuilder {
    rules: Vec<AuthorizationRule>,
    default_access: Access,
}

impl PolicyBuilder {
    pub fn rule(mut self, pattern: &str, access: Access) -> Self {
        self.rules.push(AuthorizationRule {
            matcher: AntMatcher::new(pattern),
            access,
        });
        self
    }

    pub fn permit_all(self, pattern: &str) -> Self {
        self.rule(pattern, Access::PermitAll)
    }

    pub fn has_role(self, pattern: &str, role: &str) -> Self {
        self.rule(pattern, Access::HasRole(role.to_string()))
    }

    /// Access for paths no rule matches.
    pub fn any_request(mut self, access: Access) -> Self {
        self.default_access = access;
        self
    }

    pub fn build(self) -> AuthorizationPolicy {
        AuthorizationPolicy {
            rules: self.rules,
            default_access: self.default_access,
        }
    }
}

impl AuthorizationPolicy {
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder {
            rules: Vec::new(),
            default_access: Access::DenyAll,
        }
    }

    /// The login/logout/error endpoints come first so the role table can
    /// never shadow them.
    pub fn demo(form_login: &FormLogin) -> Self {
        let builder = form_login
            .permitted_paths()
            .into_iter()
            .fold(Self::builder(), |b, path| b.permit_all(path));

        builder
            .has_role("/", "EMPLOYEE")
            .has_role("/leaders/**", "MANAGER")
            .has_role("/systems/**", "ADMIN")
            .any_request(Access::DenyAll)
            .build()
    }

    pub fn rules(&self) -> &[AuthorizationRule] {
        &self.rules
    }

    pub fn access_for(&self, path: &str) -> &Access {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(path))
            .map(|rule| &rule.access)
            .unwrap_or(&self.default_access)
    }

    pub fn evaluate(&self, path: &str, principal: Option<&Principal>) -> Decision {
        if self.access_for(path).is_granted(principal) {
            Decision::Allow
        } else if principal.is_none() {
            Decision::RequireLogin
        } else {
            Decision::Deny
        }
    }
}
