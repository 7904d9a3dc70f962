use thiserror::Error;

/// Errors raised by the admin script runner.
#[derive(Debug, Error)]
pub enum AdminError {
    /// Script name is not on the allow-list.
    #[error("script '{script}' is not allowed")]
    UnknownScript {
        /// Requested script name.
        script: String,
    },

    /// No command is configured to run scripts with.
    #[error("no script command configured")]
    EmptyCommand,

    /// The process could not be started.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}
