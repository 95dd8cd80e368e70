//! Container lifecycle management: start, stop, health checks.

use crate::config::{TestDbConfig, POSTGRES_PORT, POSTGRES_SERVICE};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout};
use tracing::{debug, info};

/// Default timeout for container startup
const CONTAINER_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Default interval between health check attempts
const HEALTH_CHECK_INTERVAL: Duration = Duration::from_millis(500);

/// Get the path to the docker-compose.yml file.
pub fn docker_compose_path() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir).join("docker").join("docker-compose.yml")
}

/// Check if Docker is available on the system.
pub fn is_docker_available() -> bool {
    Command::new("docker")
        .arg("info")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Run `docker compose` (v2), falling back to `docker-compose` (v1).
fn docker_compose_cmd(args: &[&str]) -> Result<std::process::Output> {
    let compose_file = docker_compose_path();

    let output = Command::new("docker")
        .args(["compose", "-f"])
        .arg(&compose_file)
        .args(args)
        .output();

    if let Ok(out) = output {
        if out.status.success() {
            return Ok(out);
        }
    }

    Command::new("docker-compose")
        .arg("-f")
        .arg(&compose_file)
        .args(args)
        .output()
        .context("Failed to run docker-compose")
}

/// Check if the test database container is running.
pub fn is_container_running() -> bool {
    match docker_compose_cmd(&["ps", "-q", POSTGRES_SERVICE]) {
        Ok(out) => !out.stdout.is_empty(),
        Err(_) => false,
    }
}

/// Start the test database container.
pub fn start_container() -> Result<()> {
    info!("Starting container: {}", POSTGRES_SERVICE);

    let output = docker_compose_cmd(&["up", "-d", POSTGRES_SERVICE])?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("Failed to start container {}: {}", POSTGRES_SERVICE, stderr);
    }
    Ok(())
}

async fn check_port(host: &str, port: u16) -> bool {
    let addr = format!("{}:{}", host, port);
    TcpStream::connect(&addr).await.is_ok()
}

/// Wait for PostgreSQL to accept queries.
pub async fn wait_for_healthy() -> Result<()> {
    info!("Waiting for {} to be healthy on port {}", POSTGRES_SERVICE, POSTGRES_PORT);

    let start = std::time::Instant::now();
    loop {
        if check_port("localhost", POSTGRES_PORT).await && check_postgres_ready().await {
            debug!("{} is healthy after {:?}", POSTGRES_SERVICE, start.elapsed());
            return Ok(());
        }

        if start.elapsed() > CONTAINER_STARTUP_TIMEOUT {
            bail!(
                "Timeout waiting for {} to be healthy after {:?}",
                POSTGRES_SERVICE,
                CONTAINER_STARTUP_TIMEOUT
            );
        }

        sleep(HEALTH_CHECK_INTERVAL).await;
    }
}

async fn check_postgres_ready() -> bool {
    use sqlx::postgres::PgPoolOptions;

    let conn_str = TestDbConfig::default().admin_connection_string();
    let result = timeout(
        Duration::from_secs(2),
        PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(1))
            .connect(&conn_str),
    )
    .await;

    match result {
        Ok(Ok(pool)) => sqlx::query("SELECT 1").fetch_one(&pool).await.is_ok(),
        _ => false,
    }
}

/// Ensure the container is running and healthy.
pub async fn ensure_container_running() -> Result<()> {
    if !is_docker_available() {
        bail!("Docker is not available. Please install Docker to run these tests.");
    }

    if !is_container_running() {
        start_container()?;
    }

    wait_for_healthy().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_docker_compose_path() {
        let path = docker_compose_path();
        assert!(path.ends_with("docker/docker-compose.yml"));
    }
}
