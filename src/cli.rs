use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "cjdk",
    about = "Download, cache, and run JDK or JRE distributions"
)]
pub struct Cli {
    /// JDK vendor and version, e.g. temurin:17+
    #[arg(short = 'j', long, global = true, value_name = "VENDOR:VERSION")]
    pub jdk: Option<String>,

    /// JDK vendor, e.g. temurin
    #[arg(long, global = true, value_name = "NAME")]
    pub vendor: Option<String>,

    /// JDK version expression, e.g. 17+
    #[arg(long, global = true, value_name = "EXPR")]
    pub version: Option<String>,

    /// Override the root cache directory
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<String>,

    /// Use an alternative JDK index URL
    #[arg(long, global = true, value_name = "URL")]
    pub index_url: Option<String>,

    /// Time to live for the cached JDK index, in seconds
    #[arg(long, global = true, value_name = "SECONDS")]
    pub index_ttl: Option<u64>,

    /// Operating system for the JDK (default: current)
    #[arg(long, global = true, value_name = "NAME")]
    pub os: Option<String>,

    /// Architecture for the JDK (default: current)
    #[arg(long, global = true, value_name = "NAME")]
    pub arch: Option<String>,

    /// Do not show progress bars
    #[arg(long, global = true)]
    pub no_progress: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the JDKs matching the given criteria
    Ls {
        /// List only already-cached JDKs
        #[arg(long)]
        cached: bool,
    },

    /// List the available JDK vendors
    LsVendors,

    /// Download and extract the requested JDK if it is not already cached
    Cache,

    /// Print the Java home directory for the requested JDK
    JavaHome,

    /// Run a program with the environment set for the requested JDK
    Exec {
        prog: String,
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Download and store an arbitrary file if it is not already cached
    CacheFile {
        url: String,
        filename: String,
        /// Name to display in progress messages
        #[arg(long)]
        name: Option<String>,
        /// Time to live for the cached file, in seconds
        #[arg(long, value_name = "SECONDS")]
        ttl: Option<u64>,
        /// Check the download against the given SHA-1 hash
        #[arg(long, value_name = "HASH")]
        sha1: Option<String>,
        /// Check the download against the given SHA-256 hash
        #[arg(long, value_name = "HASH")]
        sha256: Option<String>,
        /// Check the download against the given SHA-512 hash
        #[arg(long, value_name = "HASH")]
        sha512: Option<String>,
        /// Check the download against the given MD5 hash
        #[arg(long, value_name = "HASH")]
        md5: Option<String>,
    },

    /// Download, extract, and store an arbitrary archive if not already cached
    CachePackage {
        url: String,
        /// Name to display in progress messages
        #[arg(long)]
        name: Option<String>,
        /// Check the download against the given SHA-1 hash
        #[arg(long, value_name = "HASH")]
        sha1: Option<String>,
        /// Check the download against the given SHA-256 hash
        #[arg(long, value_name = "HASH")]
        sha256: Option<String>,
        /// Check the download against the given SHA-512 hash
        #[arg(long, value_name = "HASH")]
        sha512: Option<String>,
        /// Check the download against the given MD5 hash
        #[arg(long, value_name = "HASH")]
        md5: Option<String>,
    },

    /// Remove cached JDKs, indexes, files, or packages
    ClearCache {
        #[arg(value_enum, default_value_t = Scope::All)]
        scope: Scope,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Scope {
    Jdks,
    Index,
    Files,
    Pkgs,
    All,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_options_and_command() {
        let cli = Cli::parse_from([
            "cjdk",
            "--jdk",
            "temurin:17",
            "--index-ttl",
            "0",
            "java-home",
        ]);
        assert_eq!(cli.jdk.as_deref(), Some("temurin:17"));
        assert_eq!(cli.index_ttl, Some(0));
        assert!(matches!(cli.command, Command::JavaHome));
    }

    #[test]
    fn parses_separate_vendor_and_version_options() {
        let cli = Cli::parse_from(["cjdk", "--vendor", "zulu", "--version", "11+", "ls"]);
        assert_eq!(cli.vendor.as_deref(), Some("zulu"));
        assert_eq!(cli.version.as_deref(), Some("11+"));
        assert_eq!(cli.jdk, None);
        assert!(matches!(cli.command, Command::Ls { cached: false }));
    }

    #[test]
    fn exec_keeps_child_flags() {
        let cli = Cli::parse_from(["cjdk", "exec", "java", "-version", "--flag"]);
        match cli.command {
            Command::Exec { prog, args } => {
                assert_eq!(prog, "java");
                assert_eq!(args, vec!["-version", "--flag"]);
            }
            _ => panic!("expected exec"),
        }
    }

    #[test]
    fn clear_cache_defaults_to_all() {
        let cli = Cli::parse_from(["cjdk", "clear-cache"]);
        assert!(matches!(
            cli.command,
            Command::ClearCache { scope: Scope::All }
        ));

        let cli = Cli::parse_from(["cjdk", "clear-cache", "jdks"]);
        assert!(matches!(
            cli.command,
            Command::ClearCache { scope: Scope::Jdks }
        ));
    }
}
