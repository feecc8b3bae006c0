/// Default values for the `[terminal]` section
pub mod defaults {
    /// Quiescence window after which the syntax tree cache is emptied.
    pub const SYNTAX_TREE_CACHE_IDLE_MS: u64 = 10_000;
}

/// File system locations and environment overrides
pub mod paths {
    pub const CONFIG_FILE_NAME: &str = "termshield.toml";
    pub const HOME_CONFIG_DIR: &str = ".termshield";
    pub const CONFIG_PATH_ENV: &str = "TERMSHIELD_CONFIG_PATH";
    pub const WORKSPACE_ENV: &str = "TERMSHIELD_WORKSPACE";
}

/// Sinks that discard every write, per shell dialect
pub mod null_devices {
    pub const BASH: &[&str] = &["/dev/null"];

    // `CON` is the console device; writes never reach the file system.
    pub const POWERSHELL: &[&str] = &["$null", "NUL", "CON", "/dev/null"];
}
