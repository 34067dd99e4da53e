/// binlog 파일의 row 이벤트를 JSON 라인으로 출력
///
/// 사용법: binlog-row-image [FILE]
/// 파일 경로가 없으면 BINLOG_FILE 환경 변수를 사용합니다.
use binlog_row_image::cdc_engine::{CdcConfig, CdcEngine, ErrorPolicy};
use std::env;
use std::io::Write;
use tracing::info;

/// 콤마로 구분된 목록
fn env_list(name: &str) -> Option<Vec<String>> {
    let value = env::var(name).ok()?;
    let items: Vec<String> = value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (!items.is_empty()).then_some(items)
}

fn config_from_env() -> Result<CdcConfig, Box<dyn std::error::Error>> {
    let error_policy = match env::var("BINLOG_ERROR_POLICY") {
        Ok(value) => value.parse::<ErrorPolicy>()?,
        Err(_) => ErrorPolicy::default(),
    };
    let verify_checksum = env::var("BINLOG_VERIFY_CHECKSUM")
        .map(|v| !matches!(v.to_ascii_lowercase().as_str(), "0" | "false" | "no" | "off"))
        .unwrap_or(true);

    Ok(CdcConfig {
        databases: env_list("BINLOG_DATABASES").unwrap_or_default(),
        tables: env_list("BINLOG_TABLES"),
        error_policy,
        verify_checksum,
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 초기화
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let path = env::args()
        .nth(1)
        .or_else(|| env::var("BINLOG_FILE").ok())
        .ok_or("usage: binlog-row-image [FILE] (or set BINLOG_FILE)")?;

    let config = config_from_env()?;
    info!(
        "Decoding {} (error policy {:?}, verify checksum {})",
        path, config.error_policy, config.verify_checksum
    );

    let mut engine = CdcEngine::new(config);
    let changes = engine.process_file(&path).await?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for change in &changes {
        serde_json::to_writer(&mut out, change)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;

    let stats = engine.stats();
    info!(
        "{} change events from {} binlog events ({} skipped, {} filtered)",
        stats.change_events, stats.events, stats.skipped_events, stats.filtered_events
    );

    Ok(())
}
