//! Startup-error taxonomy.
//!
//! Everything in [`SetupError`] is fatal: these errors abort the process
//! before the render loop starts, so the application never runs with
//! partially-initialized GPU state. Per-frame failures (oracle hiccups,
//! shader hot-reload errors) are handled locally and never appear here.

use thiserror::Error;

/// An error that aborts startup.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Window, GL display, or GL context creation failed.
    #[error("context creation failed: {0}")]
    Context(String),

    /// A shader program failed to compile or link during initial
    /// construction. Carries the raw compiler/linker info log.
    #[error("shader program `{name}` failed to build: {log}")]
    Shader {
        /// Resource name of the failed program.
        name: &'static str,
        /// Raw GL compiler/linker diagnostic text.
        log: String,
    },

    /// A GL object allocation (buffer, texture, framebuffer, ...) failed.
    #[error("GL allocation of {resource} failed: {message}")]
    Allocation {
        /// What was being allocated.
        resource: &'static str,
        /// Raw backend message.
        message: String,
    },

    /// A tier's framebuffer was incomplete after allocation.
    #[error("framebuffer for tier {tier} is incomplete (status {status:#06x})")]
    Framebuffer {
        /// Index of the tier whose framebuffer failed the completeness check.
        tier: usize,
        /// The raw `glCheckFramebufferStatus` value.
        status: u32,
    },

    /// The external oracle process could not be started.
    #[error("oracle command `{command}` could not be started: {source}")]
    OracleSpawn {
        /// The command line that failed to spawn.
        command: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },
}

impl SetupError {
    /// Error-category label used in the fatal diagnostic block.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Context(_) => "context",
            Self::Shader { .. } => "shader",
            Self::Allocation { .. } => "allocation",
            Self::Framebuffer { .. } => "framebuffer",
            Self::OracleSpawn { .. } => "oracle",
        }
    }

    /// Name of the resource that failed, where one exists.
    pub fn resource(&self) -> String {
        match self {
            Self::Context(_) => "gl-context".to_owned(),
            Self::Shader { name, .. } => (*name).to_owned(),
            Self::Allocation { resource, .. } => (*resource).to_owned(),
            Self::Framebuffer { tier, .. } => format!("tier-{tier}-framebuffer"),
            Self::OracleSpawn { command, .. } => command.clone(),
        }
    }

    /// Raw message from the backend (GL info log, driver error, OS error).
    pub fn backend_message(&self) -> String {
        match self {
            Self::Context(message) => message.clone(),
            Self::Shader { log, .. } => log.clone(),
            Self::Allocation { message, .. } => message.clone(),
            Self::Framebuffer { status, .. } => format!("status {status:#06x}"),
            Self::OracleSpawn { source, .. } => source.to_string(),
        }
    }

    /// Render the structured diagnostic block printed before a fatal exit.
    pub fn diagnostic_block(&self) -> String {
        format!(
            "fatal startup error\n  category: {}\n  resource: {}\n  backend:  {}",
            self.category(),
            self.resource(),
            self.backend_message(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_block_carries_category_resource_and_backend_text() {
        let err = SetupError::Shader {
            name: "cube_phong",
            log: "0:12(3): error: `u_light_pos' undeclared".to_owned(),
        };
        let block = err.diagnostic_block();
        assert!(block.contains("category: shader"));
        assert!(block.contains("resource: cube_phong"));
        assert!(block.contains("u_light_pos' undeclared"));
    }

    #[test]
    fn framebuffer_error_names_the_tier() {
        let err = SetupError::Framebuffer {
            tier: 2,
            status: 0x8CD6,
        };
        assert_eq!(err.resource(), "tier-2-framebuffer");
        assert_eq!(err.category(), "framebuffer");
    }
}
