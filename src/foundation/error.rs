/// Convenience result type used across rigforge.
pub type RigResult<T> = Result<T, RigError>;

/// Top-level error taxonomy used by the part build pipeline.
#[derive(thiserror::Error, Debug)]
pub enum RigError {
    /// Bad option registration or option value.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A node with the canonical guide-root name already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// The part has no guide in the scene.
    #[error("missing guide: {0}")]
    MissingGuide(String),

    /// A rename could not be resolved against foreign node names.
    #[error("name clash: {0}")]
    Clash(String),

    /// The part type is not present in the registry catalog.
    #[error("unknown part type: {0}")]
    UnknownPartType(String),

    /// A registered part constructor failed.
    #[error("construction error for part type '{part_type}': {source}")]
    Construction {
        /// Part type whose constructor failed.
        part_type: String,
        /// Error raised by the constructor.
        #[source]
        source: anyhow::Error,
    },

    /// A driver or rig-part target is absent at rig-build time.
    #[error("missing dependency: {0}")]
    MissingDependency(String),

    /// A lifecycle step was requested out of order.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The scene collaborator rejected a node operation.
    #[error("scene error: {0}")]
    Scene(String),

    /// Errors when serializing or deserializing data structures.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RigError {
    /// Build a [`RigError::Configuration`] value.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Build a [`RigError::AlreadyExists`] value.
    pub fn already_exists(msg: impl Into<String>) -> Self {
        Self::AlreadyExists(msg.into())
    }

    /// Build a [`RigError::MissingGuide`] value.
    pub fn missing_guide(msg: impl Into<String>) -> Self {
        Self::MissingGuide(msg.into())
    }

    /// Build a [`RigError::Clash`] value.
    pub fn clash(msg: impl Into<String>) -> Self {
        Self::Clash(msg.into())
    }

    /// Build a [`RigError::UnknownPartType`] value.
    pub fn unknown_part_type(msg: impl Into<String>) -> Self {
        Self::UnknownPartType(msg.into())
    }

    /// Build a [`RigError::Construction`] value wrapping the constructor's error.
    pub fn construction(part_type: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Construction {
            part_type: part_type.into(),
            source: source.into(),
        }
    }

    /// Build a [`RigError::MissingDependency`] value.
    pub fn missing_dependency(msg: impl Into<String>) -> Self {
        Self::MissingDependency(msg.into())
    }

    /// Build a [`RigError::InvalidState`] value.
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    /// Build a [`RigError::Scene`] value.
    pub fn scene(msg: impl Into<String>) -> Self {
        Self::Scene(msg.into())
    }

    /// Build a [`RigError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// Return `true` for the clash category, which call sites may downgrade to a boolean failure.
    pub fn is_clash(&self) -> bool {
        matches!(self, Self::Clash(_))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
