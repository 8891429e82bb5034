//! Pages of the application and the gate in front of the protected ones.

use crate::session::{AuthSession, TokenStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Login,
    Register,
    Dashboard,
    CropRecommendation,
    FertilizerRecommendation,
    DiseaseDetection,
}

impl Route {
    pub const ALL: [Self; 7] = [
        Self::Home,
        Self::Login,
        Self::Register,
        Self::Dashboard,
        Self::CropRecommendation,
        Self::FertilizerRecommendation,
        Self::DiseaseDetection,
    ];

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Login => "/login",
            Self::Register => "/register",
            Self::Dashboard => "/dashboard",
            Self::CropRecommendation => "/crop-recommendation",
            Self::FertilizerRecommendation => "/fertilizer-recommendation",
            Self::DiseaseDetection => "/disease-detection",
        }
    }

    /// Dashboard-family pages need a signed-in user.
    #[must_use]
    pub const fn is_protected(self) -> bool {
        matches!(
            self,
            Self::Dashboard
                | Self::CropRecommendation
                | Self::FertilizerRecommendation
                | Self::DiseaseDetection
        )
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

#[derive(Debug, Clone)]
pub struct UnknownRoute {
    path: String,
}

impl std::fmt::Display for UnknownRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no page at '{}'", self.path)
    }
}

impl std::error::Error for UnknownRoute {}

impl std::str::FromStr for Route {
    type Err = UnknownRoute;

    /// Accepts paths with or without the leading slash or a trailing slash.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim().trim_matches('/');
        Self::ALL
            .into_iter()
            .find(|route| route.path().trim_matches('/') == trimmed)
            .ok_or_else(|| UnknownRoute {
                path: value.to_string(),
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not resolved yet; show a neutral placeholder.
    Loading,
    Render(Route),
    Redirect(Route),
}

/// Decides what to show for `route` given the session state.
pub fn guard<S: TokenStore>(route: Route, session: &AuthSession<S>) -> GuardDecision {
    if !session.is_resolved() {
        return GuardDecision::Loading;
    }
    if route.is_protected() && !session.is_authenticated() {
        return GuardDecision::Redirect(Route::Login);
    }
    GuardDecision::Render(route)
}
