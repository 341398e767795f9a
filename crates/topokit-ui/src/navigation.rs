//! Routing and the navigation bar
//!
//! Three pages exist; any other path redirects to the project list.

use std::fmt;

use tracing::debug;

/// A resolved application page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// `/`
    Projects,
    /// `/project/:id/optimize`
    Optimize {
        /// Project identifier from the path
        project_id: String,
    },
    /// `/project/:id/results`
    Results {
        /// Project identifier from the path
        project_id: String,
    },
}

impl Route {
    /// Resolve a path, redirecting unknown paths to [`Route::Projects`]
    pub fn resolve(path: &str) -> Self {
        match Self::parse(path) {
            Some(route) => route,
            None => {
                debug!("No route for {}, redirecting to /", path);
                Route::Projects
            }
        }
    }

    /// Match a path exactly; `None` for unknown paths
    pub fn parse(path: &str) -> Option<Self> {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').skip(1).collect();

        match segments.as_slice() {
            [] => Some(Route::Projects),
            ["project", id, "optimize"] if !id.is_empty() => Some(Route::Optimize {
                project_id: id.to_string(),
            }),
            ["project", id, "results"] if !id.is_empty() => Some(Route::Results {
                project_id: id.to_string(),
            }),
            _ => None,
        }
    }

    /// Canonical path for this route
    pub fn path(&self) -> String {
        match self {
            Route::Projects => "/".to_string(),
            Route::Optimize { project_id } => format!("/project/{}/optimize", project_id),
            Route::Results { project_id } => format!("/project/{}/results", project_id),
        }
    }

    pub fn project_id(&self) -> Option<&str> {
        match self {
            Route::Projects => None,
            Route::Optimize { project_id } | Route::Results { project_id } => Some(project_id),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path())
    }
}

/// Navigation bar with a collapsible menu
#[derive(Debug, Clone)]
pub struct Navigation {
    menu_open: bool,
    pathname: String,
}

impl Default for Navigation {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigation {
    pub fn new() -> Self {
        Self {
            menu_open: false,
            pathname: "/".to_string(),
        }
    }

    pub fn is_menu_open(&self) -> bool {
        self.menu_open
    }

    pub fn pathname(&self) -> &str {
        &self.pathname
    }

    pub fn toggle_menu(&mut self) {
        self.menu_open = !self.menu_open;
    }

    /// The location changed; the menu closes when the path differs
    pub fn location_changed(&mut self, pathname: &str) {
        if self.pathname != pathname {
            self.pathname = pathname.to_string();
            self.menu_open = false;
        }
    }

    /// A click landed somewhere in the window
    pub fn click(&mut self, inside_nav: bool) {
        if self.menu_open && !inside_nav {
            self.menu_open = false;
        }
    }

    pub fn render(&self) -> String {
        if self.menu_open {
            "☰ [menu open]".to_string()
        } else {
            "☰".to_string()
        }
    }
}
