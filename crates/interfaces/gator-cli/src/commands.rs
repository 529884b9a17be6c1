use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use crate::{settings_path, SettingsUpdate};
use gator_client::{ClientError, EnvironmentClient, PackageClient, TaskKind};
use gator_config::ClientSettings;
use gator_core::sorting::{sort_packages, SortState};
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

fn spinner(message: impl Into<String>) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.into());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Upper bound on how long an interrupted command waits for the backend
/// cleanup of its cancelled tasks.
const CLEANUP_GRACE: Duration = Duration::from_secs(5);

/// Await `fut`; on Ctrl-C, cancel the `kind` group and let the operation
/// settle as cancelled. Returns only once the cancelled tasks have sent their
/// `DELETE`, so exiting right after does not orphan backend work.
async fn interruptible<T>(
    packages: &PackageClient,
    kind: TaskKind,
    fut: impl Future<Output = Result<T, ClientError>>,
) -> Result<T, ClientError> {
    tokio::pin!(fut);
    tokio::select! {
        res = &mut fut => res,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling pending requests");
            let cleanup = packages.cancel_tasks_and_wait(kind);
            if tokio::time::timeout(CLEANUP_GRACE, cleanup).await.is_err() {
                warn!("Gave up waiting for cancelled tasks to clean up");
            }
            fut.await
        }
    }
}

fn finish<T>(pb: &ProgressBar, res: Result<T, ClientError>) -> Result<Option<T>> {
    match res {
        Ok(value) => {
            pb.finish_and_clear();
            Ok(Some(value))
        }
        Err(ClientError::Cancelled) => {
            pb.finish_with_message("Cancelled.");
            Ok(None)
        }
        Err(e) => {
            pb.finish_and_clear();
            Err(e.into())
        }
    }
}

fn report<T>(pb: &ProgressBar, res: Result<T, ClientError>, message: String) -> Result<()> {
    if finish(pb, res)?.is_some() {
        println!("{message}");
    }
    Ok(())
}

pub async fn cmd_env_list(client: &EnvironmentClient) -> Result<()> {
    let envs = client.environments().await?;

    println!(":: Conda environments");
    for env in envs {
        let marker = if env.is_default { "*" } else { " " };
        println!(" {} {:<24} {}", marker, env.name, env.directory_path);
    }
    Ok(())
}

pub async fn cmd_env_create(
    client: &EnvironmentClient,
    name: &str,
    kind: Option<&str>,
) -> Result<()> {
    let pb = spinner(format!("Creating environment {name}..."))?;
    report(&pb, client.create(name, kind).await, format!(":: Created {name}"))
}

pub async fn cmd_env_clone(client: &EnvironmentClient, target: &str, name: &str) -> Result<()> {
    let pb = spinner(format!("Cloning {target} into {name}..."))?;
    report(
        &pb,
        client.clone_environment(target, name).await,
        format!(":: Cloned {target} as {name}"),
    )
}

fn read_spec(file: &Utf8Path) -> Result<(String, Option<String>)> {
    let content =
        std::fs::read_to_string(file).with_context(|| format!("Failed to read {file}"))?;
    Ok((content, file.file_name().map(str::to_string)))
}

pub async fn cmd_env_import(client: &EnvironmentClient, name: &str, file: &Utf8Path) -> Result<()> {
    let (content, filename) = read_spec(file)?;
    let pb = spinner(format!("Importing {file} as {name}..."))?;
    report(
        &pb,
        client.import(name, &content, filename.as_deref()).await,
        format!(":: Imported {name}"),
    )
}

pub async fn cmd_env_update(client: &EnvironmentClient, name: &str, file: &Utf8Path) -> Result<()> {
    let (content, filename) = read_spec(file)?;
    let pb = spinner(format!("Updating {name} from {file}..."))?;
    report(
        &pb,
        client.update(name, &content, filename.as_deref()).await,
        format!(":: Updated {name}"),
    )
}

pub async fn cmd_env_export(
    client: &EnvironmentClient,
    name: &str,
    from_history: Option<bool>,
    output: Option<Utf8PathBuf>,
) -> Result<()> {
    let text = client.export(name, from_history).await?;
    if let Some(out) = output {
        std::fs::write(&out, text).with_context(|| format!("Failed to write {out}"))?;
        println!(":: Saved {name} to {out}");
    } else {
        print!("{text}");
    }
    Ok(())
}

pub async fn cmd_env_remove(client: &EnvironmentClient, name: &str) -> Result<()> {
    let pb = spinner(format!("Removing environment {name}..."))?;
    report(&pb, client.remove(name).await, format!(":: Removed {name}"))
}

pub async fn cmd_env_channels(client: &EnvironmentClient, name: &str) -> Result<()> {
    let channels = client.channels(name).await?;
    for (channel, urls) in channels {
        println!("{channel}");
        for url in urls {
            println!("   {url}");
        }
    }
    Ok(())
}

pub async fn cmd_pkg_list(
    client: &EnvironmentClient,
    env: &str,
    available: bool,
    sort: SortState,
) -> Result<()> {
    let packages = client.package_manager(Some(env));
    let pb = spinner(format!("Listing packages of {env}..."))?;
    let res = interruptible(
        &packages,
        TaskKind::Default,
        packages.refresh(available, None),
    )
    .await;
    let Some(rows) = finish(&pb, res)? else {
        return Ok(());
    };

    println!(
        "{:<32} {:<16} {:<16} {}",
        "Name", "Installed", "Latest", "Channel"
    );
    for pkg in sort_packages(&rows, sort) {
        let installed = pkg.version_installed.as_deref().unwrap_or("-");
        let latest = pkg.version.last().map(String::as_str).unwrap_or("-");
        println!(
            "{:<32} {:<16} {:<16} {}",
            pkg.name, installed, latest, pkg.channel
        );
        if !pkg.summary.is_empty() && packages.has_description() {
            println!("    {}", pkg.summary);
        }
    }
    Ok(())
}

pub async fn cmd_pkg_check_updates(client: &EnvironmentClient, env: &str) -> Result<()> {
    let packages = client.package_manager(Some(env));
    let pb = spinner(format!("Checking {env} for updates..."))?;
    let res = interruptible(&packages, TaskKind::Default, packages.check_updates(None)).await;
    let Some(updates) = finish(&pb, res)? else {
        return Ok(());
    };

    if updates.is_empty() {
        println!(":: {env} is up to date");
    } else {
        println!(":: Updates available in {env}");
        for name in updates {
            println!("   {name}");
        }
    }
    Ok(())
}

pub async fn cmd_pkg_install(
    client: &EnvironmentClient,
    env: &str,
    specs: &[String],
) -> Result<()> {
    let packages = client.package_manager(Some(env));
    let pb = spinner(format!("Installing {} into {env}...", specs.join(" ")))?;
    report(&pb, packages.install(specs, None).await, format!(":: Installed {}", specs.join(", ")))
}

pub async fn cmd_pkg_update(client: &EnvironmentClient, env: &str, specs: &[String]) -> Result<()> {
    let packages = client.package_manager(Some(env));
    let pb = spinner(format!("Updating {} in {env}...", specs.join(" ")))?;
    report(&pb, packages.update(specs, None).await, format!(":: Updated {}", specs.join(", ")))
}

pub async fn cmd_pkg_remove(client: &EnvironmentClient, env: &str, names: &[String]) -> Result<()> {
    let packages = client.package_manager(Some(env));
    let pb = spinner(format!("Removing {} from {env}...", names.join(" ")))?;
    report(&pb, packages.remove(names, None).await, format!(":: Removed {}", names.join(", ")))
}

pub async fn cmd_pkg_develop(client: &EnvironmentClient, env: &str, path: &Utf8Path) -> Result<()> {
    let packages = client.package_manager(Some(env));
    let pb = spinner(format!("Installing {path} in development mode..."))?;
    report(
        &pb,
        packages.develop(path, None).await,
        format!(":: Installed {path} in development mode"),
    )
}

pub async fn cmd_pkg_deps(client: &EnvironmentClient, env: &str, name: &str) -> Result<()> {
    let packages = client.package_manager(Some(env));
    let pb = spinner(format!("Resolving dependencies of {name}..."))?;
    let res = interruptible(
        &packages,
        TaskKind::Dependencies,
        packages.dependencies(name, true),
    )
    .await;
    let Some(graph) = finish(&pb, res)? else {
        return Ok(());
    };

    for (pkg, deps) in graph {
        if deps.is_empty() {
            println!("{pkg}");
        } else {
            println!("{pkg} -> {}", deps.join(", "));
        }
    }
    Ok(())
}

pub fn cmd_config_show(settings: &ClientSettings) {
    println!(":: Settings");
    println!("   {:<18} {}", "base_url", settings.base_url);
    println!("   {:<18} {}", "from_history", settings.from_history);
    println!("   {:<18} {}", "whitelist", settings.whitelist);
    println!("   {:<18} {}", "poll_interval_ms", settings.poll_interval_ms);
    println!(":: Environment types");
    for (name, packages) in &settings.environment_types {
        println!("   {:<18} {}", name, packages.join(" "));
    }
}

/// Apply `update` to the stored settings file and write it back. Command
/// line overrides such as `--url` are not persisted.
pub fn cmd_config_set(path: Option<&Utf8Path>, update: SettingsUpdate) -> Result<ClientSettings> {
    let path = settings_path(path).context("No settings location found, pass --settings")?;
    let mut settings = ClientSettings::load(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    update.apply(&mut settings);
    settings
        .save(&path)
        .with_context(|| format!("Failed to save settings to {}", path.display()))?;
    println!(":: Saved settings to {}", path.display());
    Ok(settings)
}
