use anyhow::{anyhow, Result};
use scanstream::{
    permissions, FrameData, FrameSink, NokhwaBackend, ScannerService, ScanstreamConfig,
};
use std::env;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn main() -> Result<()> {
    scanstream::init_logging();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: scanstream-cli <command> [args]");
        eprintln!("Commands: devices | permission | validate <digits> | decode <image> | scan");
        std::process::exit(1);
    }

    let command = &args[1];
    match command.as_str() {
        "devices" => cmd_devices(&args),
        "permission" => cmd_permission(&args),
        "validate" => cmd_validate(&args),
        "decode" => cmd_decode(&args),
        "scan" => cmd_scan(&args),
        _ => {
            eprintln!("Unknown command: {}", command);
            std::process::exit(1);
        }
    }
}

fn cmd_devices(args: &[String]) -> Result<()> {
    let backend = NokhwaBackend::new();
    let session = scanstream::CameraSession::new(
        Arc::new(backend),
        ScanstreamConfig::load_or_default().camera,
    );
    let devices = session.enumerate_devices()?;
    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string(&devices)?);
    } else {
        for d in devices {
            println!("{}: {}", d.id, d.label);
        }
    }
    Ok(())
}

fn cmd_permission(args: &[String]) -> Result<()> {
    let status = permissions::check_permission();
    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string(&status)?);
    } else {
        println!("{:?}", status.state);
        if let Some(detail) = status.detail {
            println!("{}", detail);
        }
    }
    Ok(())
}

fn cmd_validate(args: &[String]) -> Result<()> {
    let input = args
        .get(2)
        .ok_or_else(|| anyhow!("Usage: scanstream-cli validate <digits>"))?;
    let result = scanstream::validate(input);
    if args.contains(&"--json".to_string()) {
        println!("{}", serde_json::to_string(&result)?);
    } else if result.valid {
        println!("valid {} {}", result.format, result.normalized.unwrap_or_default());
    } else {
        println!("invalid: {}", result.reason.unwrap_or_default());
    }
    Ok(())
}

fn cmd_decode(args: &[String]) -> Result<()> {
    let path = args
        .get(2)
        .ok_or_else(|| anyhow!("Usage: scanstream-cli decode <image> [--json]"))?;
    let config = ScanstreamConfig::load_or_default();

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let mut scanner = ScannerService::new(Arc::new(NokhwaBackend::new()), config);
        scanner.initialize().await?;
        let result = scanner.scan_from_image(Path::new(path)).await?;
        if args.contains(&"--json".to_string()) {
            println!("{}", serde_json::to_string(&result)?);
        } else {
            println!("{} ({})", result.text, result.format);
        }
        scanner.dispose().await;
        Ok(())
    })
}

struct NullSink;

impl FrameSink for NullSink {
    fn present(&mut self, _frame: &FrameData) {}
}

fn cmd_scan(args: &[String]) -> Result<()> {
    let mut config = ScanstreamConfig::load_or_default();
    let json = args.contains(&"--json".to_string());

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--device" => {
                i += 1;
                config.camera.preferred_device = Some(
                    args.get(i)
                        .ok_or_else(|| anyhow!("--device requires a value"))?
                        .clone(),
                );
            }
            _ => {}
        }
        i += 1;
    }

    let stop_flag = Arc::new(AtomicBool::new(false));
    {
        let stop_flag = stop_flag.clone();
        ctrlc::set_handler(move || {
            stop_flag.store(true, Ordering::SeqCst);
        })?;
    }

    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let mut scanner = ScannerService::new(Arc::new(NokhwaBackend::new()), config);
        scanner.on_result(move |result| {
            if json {
                match serde_json::to_string(&result) {
                    Ok(line) => println!("{}", line),
                    Err(e) => eprintln!("serialization error: {}", e),
                }
            } else {
                println!("{} ({})", result.text, result.format);
            }
        });
        scanner.on_error(|error| eprintln!("error: {}", error));

        scanner.initialize().await?;
        scanner.start(Box::new(NullSink)).await?;
        eprintln!("Scanning... press Ctrl-C to stop");

        while !stop_flag.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        scanner.stop().await;
        scanner.dispose().await;
        Ok(())
    })
}
