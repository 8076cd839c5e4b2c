use std::fmt;
use std::hash::{Hash, Hasher};

/// A concrete server build a registry can install.
///
/// Identity is `(name, server_version)`; the target Minecraft version and the
/// owning registry are carried along but never compared.
#[derive(Debug, Clone)]
pub struct Server {
    pub name: String,
    pub server_version: String,
    pub minecraft_version: String,
    /// Lowercase key of the owning server registry.
    pub registry: String,
}

impl Server {
    pub fn new(
        name: impl Into<String>,
        server_version: impl Into<String>,
        minecraft_version: impl Into<String>,
        registry: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            server_version: server_version.into(),
            minecraft_version: minecraft_version.into(),
            registry: registry.into().to_lowercase(),
        }
    }

    /// Canonical local filename: `{name}-{server_version}.jar`.
    pub fn asset(&self) -> String {
        format!("{}-{}.jar", self.name, self.server_version)
    }

    pub fn is_loader(&self, loader: &str) -> bool {
        self.name.eq_ignore_ascii_case(loader)
    }
}

impl PartialEq for Server {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.server_version == other.server_version
    }
}

impl Eq for Server {}

impl Hash for Server {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.server_version.hash(state);
    }
}

impl fmt::Display for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.server_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_ignores_minecraft_version_and_registry() {
        let a = Server::new("Paper", "1.21.1", "1.21.1", "paper");
        let b = Server::new("Paper", "1.21.1", "something-else", "mirror");
        let c = Server::new("Paper", "1.21", "1.21", "paper");
        let d = Server::new("Purpur", "1.21.1", "1.21.1", "paper");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, d);

        let set: HashSet<Server> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn asset_uses_name_and_server_version() {
        let server = Server::new("Paper", "1.20.4", "1.20.4", "Paper");
        assert_eq!(server.asset(), "Paper-1.20.4.jar");
        assert_eq!(server.registry, "paper");
    }

    #[test]
    fn loader_match_is_case_insensitive() {
        let server = Server::new("Paper", "1.20.4", "1.20.4", "paper");
        assert!(server.is_loader("PAPER"));
        assert!(!server.is_loader("spigot"));
    }
}
