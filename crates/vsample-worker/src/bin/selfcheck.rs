use std::path::Path;
use std::process::Command;

use vsample_media::WorkspaceManager;
use vsample_worker::WorkerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = WorkerConfig::from_env()?;

    println!(
        "vsample-selfcheck: starting with work_dir={} output_dir={}",
        config.work_dir.display(),
        config.output_dir.display()
    );
    ensure_writable(&config.work_dir).await?;
    ensure_writable(&config.output_dir).await?;
    ensure_tool("ffmpeg")?;
    ensure_tool("ffprobe")?;

    let swept = WorkspaceManager::new(&config.work_dir).sweep()?;
    if swept > 0 {
        println!("vsample-selfcheck: removed {} stale workspace(s)", swept);
    }

    println!("vsample-selfcheck: ok");
    Ok(())
}

async fn ensure_writable(path: &Path) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(path).await?;
    let probe = path.join(".vsample-selfcheck");
    tokio::fs::write(&probe, b"ok")
        .await
        .map_err(|e| anyhow::anyhow!("{} is not writable: {}", path.display(), e))?;
    tokio::fs::remove_file(&probe).await?;
    Ok(())
}

fn ensure_tool(name: &str) -> anyhow::Result<()> {
    let output = Command::new(name)
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("{} not available: {}", name, e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!("{} -version failed: {:?}", name, output.status));
    }
    Ok(())
}
