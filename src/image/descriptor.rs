//! Build descriptor generation per application type.
//!
//! Maps a validated deploy request to a concrete Dockerfile. Only
//! `web-application` is implemented; other types fail with an unsupported
//! type error before any filesystem side effect. Adding a type means adding
//! a new render function here, not a templating layer.

use crate::error::ValidationError;
use crate::model::AppType;
use crate::queue::DeployRequest;

/// Base image for web applications.
const WEB_BASE_IMAGE: &str = "node:22-alpine";

/// A rendered, self-contained build specification.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildDescriptor {
    /// Dockerfile content consumed by the container runtime.
    pub dockerfile: String,
    /// Port the built application listens on inside the container.
    pub container_port: u16,
    /// Argument vector form of the start command.
    pub start_command: Vec<String>,
}

impl BuildDescriptor {
    /// Validates the request and renders the descriptor for its type.
    ///
    /// Validation happens before anything touches the filesystem: a request
    /// rejected here leaves no workspace behind.
    ///
    /// # Errors
    ///
    /// `ValidationError` for missing fields, an untokenizable start
    /// command, or an application type without a generator.
    pub fn render(request: &DeployRequest) -> Result<Self, ValidationError> {
        validate(request)?;

        match request.app_type {
            AppType::WebApplication => Ok(render_web_application(request)),
            other => Err(ValidationError::UnsupportedAppType(other.to_string())),
        }
    }
}

/// Field-level validation shared by all descriptor generators.
fn validate(request: &DeployRequest) -> Result<(), ValidationError> {
    if request.git_url.trim().is_empty() {
        return Err(ValidationError::MissingField("git_url"));
    }
    if request.git_branch.trim().is_empty() {
        return Err(ValidationError::MissingField("git_branch"));
    }
    if request.install_command.trim().is_empty() {
        return Err(ValidationError::MissingField("install_command"));
    }
    if request.build_command.trim().is_empty() {
        return Err(ValidationError::MissingField("build_command"));
    }
    if tokenize(&request.start_command).is_empty() {
        return Err(ValidationError::EmptyStartCommand);
    }
    for key in request.environment.keys() {
        if !is_valid_env_key(key) {
            return Err(ValidationError::InvalidEnvKey(key.clone()));
        }
    }
    Ok(())
}

/// Splits a command string into its argument vector.
///
/// `"npm start"` becomes `["npm", "start"]`; repeated whitespace is
/// collapsed.
pub fn tokenize(command: &str) -> Vec<String> {
    command
        .split_whitespace()
        .map(|token| token.to_string())
        .collect()
}

fn render_web_application(request: &DeployRequest) -> BuildDescriptor {
    let container_port = request.app_type.container_port();
    let start_command = tokenize(&request.start_command);
    let clone_url = clone_url(&request.git_url, request.git_token.as_deref());

    let mut lines = Vec::new();

    lines.push(format!("FROM {WEB_BASE_IMAGE}"));
    lines.push(String::new());
    lines.push("WORKDIR /app".to_string());
    lines.push(String::new());

    // Global package managers the install/build commands may expect.
    lines.push("RUN npm install -g pnpm yarn".to_string());
    lines.push(String::new());

    lines.push("RUN apk add --no-cache git && \\".to_string());
    lines.push(format!(
        "    git clone --depth 1 --branch {} {} .",
        request.git_branch, clone_url
    ));
    lines.push(String::new());

    if request.git_folder != "." && !request.git_folder.is_empty() {
        lines.push(format!("WORKDIR /app/{}", request.git_folder));
        lines.push(String::new());
    }

    // Deterministic ENV order so identical requests render identical files.
    let mut env: Vec<_> = request.environment.iter().collect();
    env.sort_by(|a, b| a.0.cmp(b.0));
    for (key, value) in env {
        lines.push(format!("ENV {}=\"{}\"", key, escape_env_value(value)));
    }
    if !request.environment.is_empty() {
        lines.push(String::new());
    }

    lines.push(format!("RUN {}", request.install_command));
    lines.push(String::new());
    lines.push(format!("RUN {}", request.build_command));
    lines.push(String::new());

    lines.push(format!("EXPOSE {container_port}"));
    lines.push(String::new());

    lines.push(format!(
        "CMD {}",
        serde_json::to_string(&start_command).expect("string vector always serializes")
    ));

    BuildDescriptor {
        dockerfile: lines.join("\n"),
        container_port,
        start_command,
    }
}

/// Injects a token into an https clone URL for private repositories.
fn clone_url(git_url: &str, token: Option<&str>) -> String {
    match token {
        Some(token) if !token.is_empty() => {
            if let Some(rest) = git_url.strip_prefix("https://") {
                format!("https://{token}@{rest}")
            } else {
                git_url.to_string()
            }
        }
        _ => git_url.to_string(),
    }
}

/// Escape special characters in environment variable values for Dockerfile.
fn escape_env_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$")
}

/// Environment keys must be shell-identifier-like to render safely.
fn is_valid_env_key(key: &str) -> bool {
    !key.is_empty()
        && !key.chars().next().is_some_and(|c| c.is_ascii_digit())
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use uuid::Uuid;

    fn request() -> DeployRequest {
        DeployRequest {
            app_id: Uuid::new_v4(),
            deployment_id: Uuid::new_v4(),
            app_type: AppType::WebApplication,
            git_url: "https://example.com/r.git".to_string(),
            git_branch: "main".to_string(),
            git_folder: ".".to_string(),
            git_token: None,
            environment: HashMap::new(),
            install_command: "npm install".to_string(),
            build_command: "npm run build".to_string(),
            start_command: "npm start".to_string(),
        }
    }

    #[test]
    fn test_tokenize_start_commands() {
        assert_eq!(tokenize("npm start"), vec!["npm", "start"]);
        assert_eq!(tokenize("python3 main.py"), vec!["python3", "main.py"]);
        assert_eq!(tokenize("  node   server.js  "), vec!["node", "server.js"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_render_web_application() {
        let descriptor = BuildDescriptor::render(&request()).expect("render");

        assert!(descriptor.dockerfile.contains("FROM node:22-alpine"));
        assert!(descriptor
            .dockerfile
            .contains("git clone --depth 1 --branch main https://example.com/r.git ."));
        assert!(descriptor.dockerfile.contains("RUN npm install"));
        assert!(descriptor.dockerfile.contains("RUN npm run build"));
        assert!(descriptor.dockerfile.contains("EXPOSE 3000"));
        assert!(descriptor.dockerfile.contains("CMD [\"npm\",\"start\"]"));
        assert_eq!(descriptor.container_port, 3000);
        assert_eq!(descriptor.start_command, vec!["npm", "start"]);
    }

    #[test]
    fn test_unsupported_types_fail_fast() {
        let mut req = request();
        req.app_type = AppType::BotService;
        let err = BuildDescriptor::render(&req).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedAppType(_)));
        assert!(err.to_string().contains("bot-service"));

        req.app_type = AppType::GenericServer;
        assert!(matches!(
            BuildDescriptor::render(&req),
            Err(ValidationError::UnsupportedAppType(_))
        ));
    }

    #[test]
    fn test_missing_fields_rejected() {
        let mut req = request();
        req.git_url = "  ".to_string();
        assert!(matches!(
            BuildDescriptor::render(&req),
            Err(ValidationError::MissingField("git_url"))
        ));

        let mut req = request();
        req.git_branch = String::new();
        assert!(matches!(
            BuildDescriptor::render(&req),
            Err(ValidationError::MissingField("git_branch"))
        ));

        let mut req = request();
        req.start_command = "   ".to_string();
        assert!(matches!(
            BuildDescriptor::render(&req),
            Err(ValidationError::EmptyStartCommand)
        ));
    }

    #[test]
    fn test_git_token_injected_into_https_url() {
        let mut req = request();
        req.git_token = Some("tok123".to_string());
        let descriptor = BuildDescriptor::render(&req).expect("render");
        assert!(descriptor
            .dockerfile
            .contains("https://tok123@example.com/r.git"));
    }

    #[test]
    fn test_subfolder_changes_workdir() {
        let mut req = request();
        req.git_folder = "packages/web".to_string();
        let descriptor = BuildDescriptor::render(&req).expect("render");
        assert!(descriptor.dockerfile.contains("WORKDIR /app/packages/web"));
    }

    #[test]
    fn test_env_vars_rendered_sorted_and_escaped() {
        let mut req = request();
        req.environment
            .insert("ZULU".to_string(), "plain".to_string());
        req.environment
            .insert("ALPHA".to_string(), "with\"quote$var".to_string());
        let descriptor = BuildDescriptor::render(&req).expect("render");

        let alpha = descriptor
            .dockerfile
            .find("ENV ALPHA=\"with\\\"quote\\$var\"")
            .expect("escaped ALPHA present");
        let zulu = descriptor
            .dockerfile
            .find("ENV ZULU=\"plain\"")
            .expect("ZULU present");
        assert!(alpha < zulu);
    }

    #[test]
    fn test_invalid_env_key_rejected() {
        let mut req = request();
        req.environment
            .insert("BAD KEY".to_string(), "x".to_string());
        assert!(matches!(
            BuildDescriptor::render(&req),
            Err(ValidationError::InvalidEnvKey(_))
        ));
    }
}
