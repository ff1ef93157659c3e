use tokio::process::Command;

/// Check if a command is available in PATH
pub async fn check_command_available(command: &str) -> bool {
    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Check if the current environment has the optional tools
pub async fn check_dependencies(yt_dlp_path: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(yt_dlp_path).await {
        missing.push(format!(
            "{} - used as the second caption source and for audio URLs",
            yt_dlp_path
        ));
    }

    missing
}
