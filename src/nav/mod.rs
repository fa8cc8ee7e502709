pub mod auth_status;
pub mod progress;

use serde::Serialize;

pub use auth_status::{AuthPhase, AuthStatus, NavAction};
pub use progress::{DEFAULT_PROGRESS_DURATION, NavigationProgress, is_route_change};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavLink {
    pub name: &'static str,
    pub href: &'static str,
}

pub const NAV_LINKS: [NavLink; 4] = [
    NavLink {
        name: "Home",
        href: "/",
    },
    NavLink {
        name: "Dashboard",
        href: "/dashboard",
    },
    NavLink {
        name: "Vault",
        href: "/vault",
    },
    NavLink {
        name: "Talent-Profile",
        href: "/talent-profile",
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLinkView {
    pub name: &'static str,
    pub href: &'static str,
    pub active: bool,
}

/// The nav links for `pathname`; a link is active only on an exact path match.
pub fn nav_links(pathname: &str) -> Vec<NavLinkView> {
    NAV_LINKS
        .iter()
        .map(|link| NavLinkView {
            name: link.name,
            href: link.href,
            active: link.href == pathname,
        })
        .collect()
}
