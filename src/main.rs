mod api;
mod cache;
mod cli;
mod config;
mod error;
mod index;
mod install;
mod jdk;
mod progress;
mod version;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use api::ClearScope;
use cli::{Cli, Command, Scope};
use config::{EnvConfig, Options};
use error::CjdkError;
use install::Hashes;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("cjdk=info".parse().unwrap()),
        )
        .with_target(false)
        .without_time()
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("cjdk: error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, CjdkError> {
    let env = EnvConfig::from_env();
    let options = Options {
        jdk: cli.jdk,
        vendor: cli.vendor,
        version: cli.version,
        cache_dir: cli.cache_dir.map(PathBuf::from),
        index_url: cli.index_url,
        index_ttl: cli.index_ttl,
        os: cli.os,
        arch: cli.arch,
        progress: cli.no_progress.then_some(false),
    };

    match cli.command {
        Command::Ls { cached } => {
            for jdk in api::list_jdks(options, &env, cached).await? {
                println!("{jdk}");
            }
        }
        Command::LsVendors => {
            for vendor in api::list_vendors(options, &env).await? {
                println!("{vendor}");
            }
        }
        Command::Cache => {
            api::cache_jdk(options, &env).await?;
        }
        Command::JavaHome => {
            println!("{}", api::java_home(options, &env).await?.display());
        }
        Command::Exec { prog, args } => {
            return exec(options, &env, &prog, &args).await;
        }
        Command::CacheFile {
            url,
            filename,
            name,
            ttl,
            sha1,
            sha256,
            sha512,
            md5,
        } => {
            let hashes = Hashes {
                sha1,
                sha256,
                sha512,
                md5,
            };
            let name = name.unwrap_or_else(|| "file".to_string());
            let path =
                api::cache_file(options, &env, &name, &url, &filename, ttl, hashes).await?;
            println!("{}", path.display());
        }
        Command::CachePackage {
            url,
            name,
            sha1,
            sha256,
            sha512,
            md5,
        } => {
            let hashes = Hashes {
                sha1,
                sha256,
                sha512,
                md5,
            };
            let name = name.unwrap_or_else(|| "package".to_string());
            let path = api::cache_package(options, &env, &name, &url, hashes).await?;
            println!("{}", path.display());
        }
        Command::ClearCache { scope } => {
            let scope = match scope {
                Scope::Jdks => ClearScope::Jdks,
                Scope::Index => ClearScope::Index,
                Scope::Files => ClearScope::Files,
                Scope::Pkgs => ClearScope::Pkgs,
                Scope::All => ClearScope::All,
            };
            api::clear_cache(options, &env, scope)?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

// Only the child's environment is prepared; the parent process env is never
// touched here.
async fn exec(
    options: Options,
    env: &EnvConfig,
    prog: &str,
    args: &[String],
) -> Result<ExitCode, CjdkError> {
    let home = api::java_home(options, env).await?;
    let path = api::path_with_bin(&home, std::env::var_os("PATH").as_ref())?;

    let mut command = std::process::Command::new(prog);
    command.args(args).env("JAVA_HOME", &home).env("PATH", path);

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        let err = command.exec();
        Err(CjdkError::Install(format!("failed to exec {prog}: {err}")))
    }
    #[cfg(not(unix))]
    {
        let status = command
            .status()
            .map_err(|err| CjdkError::Install(format!("failed to run {prog}: {err}")))?;
        Ok(ExitCode::from(status.code().unwrap_or(1) as u8))
    }
}
