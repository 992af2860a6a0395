/// OAuth2 scopes gating the catalogue API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointPermission {
    /// Create, update and delete products.
    EditCatalogue,
    /// Read products.
    ViewCatalogue,
}

impl EndpointPermission {
    pub const ALL: [EndpointPermission; 2] = [
        EndpointPermission::EditCatalogue,
        EndpointPermission::ViewCatalogue,
    ];

    /// Raw scope value as it appears in the token's `scope` claim.
    #[must_use]
    pub fn scope(self) -> &'static str {
        match self {
            EndpointPermission::EditCatalogue => "edit_catalogue",
            EndpointPermission::ViewCatalogue => "view_catalogue",
        }
    }

    /// Authority name granted for the scope (`SCOPE_<scope>`).
    #[must_use]
    pub fn authority(self) -> &'static str {
        match self {
            EndpointPermission::EditCatalogue => "SCOPE_edit_catalogue",
            EndpointPermission::ViewCatalogue => "SCOPE_view_catalogue",
        }
    }

    #[must_use]
    pub fn from_scope(scope: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.scope() == scope)
    }
}
