//! Application types and per-type command defaults.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of application being deployed.
///
/// Each type maps to a build descriptor; adding a type means adding a new
/// descriptor generator, not extending a generic template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppType {
    /// A web application listening on an HTTP port (Node.js toolchain).
    WebApplication,
    /// A long-running bot process with no inbound port.
    BotService,
    /// A generic long-running server.
    GenericServer,
}

impl AppType {
    /// Port the application listens on inside its container.
    pub fn container_port(&self) -> u16 {
        match self {
            AppType::WebApplication => 3000,
            AppType::BotService => 3000,
            AppType::GenericServer => 3000,
        }
    }

    /// Default install/build/start commands for this type, substituted by
    /// the enqueue path when the application leaves a command unset.
    pub fn command_defaults(&self) -> CommandDefaults {
        match self {
            AppType::WebApplication | AppType::GenericServer => CommandDefaults {
                install: "npm install",
                build: "npm run build",
                start: "npm run start",
            },
            AppType::BotService => CommandDefaults {
                install: "pip install -r requirements.txt",
                build: "pip install -r requirements.txt",
                start: "python3 main.py",
            },
        }
    }
}

impl std::fmt::Display for AppType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppType::WebApplication => write!(f, "web-application"),
            AppType::BotService => write!(f, "bot-service"),
            AppType::GenericServer => write!(f, "generic-server"),
        }
    }
}

/// Default commands for an application type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDefaults {
    pub install: &'static str,
    pub build: &'static str,
    pub start: &'static str,
}

/// Read-only application contract, owned by the CRUD layer.
///
/// The core never writes applications; the enqueue path reads one of these
/// (or its CLI equivalent) and resolves command defaults before a job is
/// placed on the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Application {
    pub id: Uuid,
    pub name: String,
    pub app_type: AppType,
    pub git_url: String,
    pub git_branch: String,
    #[serde(default)]
    pub git_token: Option<String>,
    /// Subfolder within the repository to deploy; "." means repository root.
    #[serde(default = "default_git_folder")]
    pub git_folder: String,
    /// Environment variables injected into the built image. Keys are unique.
    #[serde(default)]
    pub environment: HashMap<String, String>,
    #[serde(default)]
    pub start_command: Option<String>,
    #[serde(default)]
    pub install_command: Option<String>,
    #[serde(default)]
    pub build_command: Option<String>,
}

fn default_git_folder() -> String {
    ".".to_string()
}

impl Application {
    /// Resolved start command: the application's own, or the type default.
    pub fn resolved_start_command(&self) -> String {
        self.start_command
            .clone()
            .unwrap_or_else(|| self.app_type.command_defaults().start.to_string())
    }

    /// Resolved install command: the application's own, or the type default.
    pub fn resolved_install_command(&self) -> String {
        self.install_command
            .clone()
            .unwrap_or_else(|| self.app_type.command_defaults().install.to_string())
    }

    /// Resolved build command: the application's own, or the type default.
    pub fn resolved_build_command(&self) -> String {
        self.build_command
            .clone()
            .unwrap_or_else(|| self.app_type.command_defaults().build.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_app(app_type: AppType) -> Application {
        Application {
            id: Uuid::new_v4(),
            name: "demo".to_string(),
            app_type,
            git_url: "https://example.com/r.git".to_string(),
            git_branch: "main".to_string(),
            git_token: None,
            git_folder: ".".to_string(),
            environment: HashMap::new(),
            start_command: None,
            install_command: None,
            build_command: None,
        }
    }

    #[test]
    fn test_app_type_serde_tags() {
        assert_eq!(
            serde_json::to_string(&AppType::WebApplication).unwrap(),
            "\"web-application\""
        );
        assert_eq!(
            serde_json::from_str::<AppType>("\"bot-service\"").unwrap(),
            AppType::BotService
        );
        assert_eq!(
            serde_json::from_str::<AppType>("\"generic-server\"").unwrap(),
            AppType::GenericServer
        );
    }

    #[test]
    fn test_defaults_substituted_when_commands_absent() {
        let app = sample_app(AppType::WebApplication);
        assert_eq!(app.resolved_install_command(), "npm install");
        assert_eq!(app.resolved_build_command(), "npm run build");
        assert_eq!(app.resolved_start_command(), "npm run start");

        let bot = sample_app(AppType::BotService);
        assert_eq!(bot.resolved_start_command(), "python3 main.py");
        assert_eq!(bot.resolved_install_command(), "pip install -r requirements.txt");
    }

    #[test]
    fn test_explicit_commands_win_over_defaults() {
        let mut app = sample_app(AppType::WebApplication);
        app.start_command = Some("node server.js".to_string());
        assert_eq!(app.resolved_start_command(), "node server.js");
    }

    #[test]
    fn test_container_port() {
        assert_eq!(AppType::WebApplication.container_port(), 3000);
    }
}
