use clap::{Parser, Subcommand};
use std::process::Command;

/// kubescape 워크스페이스 개발 태스크
#[derive(Parser)]
#[command(name = "xtask")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 포맷 검사 (`--fix`로 적용)
    Fmt {
        #[arg(long)]
        fix: bool,
    },
    /// clippy (경고를 에러로 처리)
    Lint,
    /// 워크스페이스 전체 테스트
    Test,
    /// fmt + lint + test 순서로 실행
    Ci,
    /// 퍼징 타겟 실행 (nightly, cargo-fuzz 필요)
    Fuzz {
        /// 타겟 이름 (예: fuzz_scan_output)
        target: String,
        /// 최대 실행 시간 (초)
        #[arg(long, default_value_t = 60)]
        max_total_time: u64,
    },
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Fmt { fix } => fmt(fix),
        Commands::Lint => lint(),
        Commands::Test => test(),
        Commands::Ci => {
            fmt(false);
            lint();
            test();
        }
        Commands::Fuzz {
            target,
            max_total_time,
        } => fuzz(&target, max_total_time),
    }
}

fn fmt(fix: bool) {
    let mut args = vec!["fmt", "--all"];
    if !fix {
        args.extend(["--", "--check"]);
    }
    cargo("fmt", &args);
}

fn lint() {
    cargo(
        "clippy",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
    );
}

fn test() {
    cargo("test", &["test", "--workspace"]);
}

fn fuzz(target: &str, max_total_time: u64) {
    let max_time = format!("-max_total_time={max_total_time}");
    let mut cmd = Command::new("cargo");
    cmd.current_dir("fuzz")
        .args(["+nightly", "fuzz", "run", target, "--", max_time.as_str()]);
    run("fuzz", cmd);
}

fn cargo(step: &str, args: &[&str]) {
    let mut cmd = Command::new("cargo");
    cmd.args(args);
    run(step, cmd);
}

fn run(step: &str, mut cmd: Command) {
    let status = cmd.status().expect("failed to spawn cargo");
    if !status.success() {
        eprintln!("{step} failed");
        std::process::exit(status.code().unwrap_or(1));
    }

    println!("{step} succeeded");
}
