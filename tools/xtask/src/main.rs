//! # xtask - 开发辅助工具
//!
//! 提供本地质量门禁与资源检查命令。
//!
//! ## 命令
//!
//! - `check-all`: 运行 fmt、clippy、test
//! - `asset-check`: 检查资源目录（ACT 解码、ANM / GAS 解析警告、引用与标签）
//!
//! ```bash
//! cargo xtask check-all
//! cargo xtask asset-check assets --config anim.json --verbose
//! ```

use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};
use std::sync::Arc;

use anim_runtime::{
    Diagnostic, DiagnosticResult, GasParser, MemoryResolver, RuntimeConfig, TimelineParser,
    analyze_animation, analyze_script, normalize_name,
};
use clap::{Parser, Subcommand};
use tracing::{Level, debug, info};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "开发辅助工具")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// 输出调试日志
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行 fmt、clippy、test 门禁检查
    CheckAll,

    /// 检查资源目录
    AssetCheck {
        /// 资源目录（默认：assets）
        #[arg(default_value = "assets")]
        dir: PathBuf,

        /// 运行时配置文件
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

const AUDIO_EXTENSIONS: [&str; 3] = ["wav", "ogg", "mp3"];

fn run(step: &str, cmd: &mut Command) -> anyhow::Result<()> {
    eprintln!("\n==> {step}");
    let status = cmd.status()?;
    if !status.success() {
        anyhow::bail!("{step} failed with {status}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main(cli.command) {
        eprintln!("xtask error: {e:#}");
        return ExitCode::from(1);
    }
    ExitCode::from(0)
}

fn real_main(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::CheckAll => {
            let mut fmt = Command::new("cargo");
            fmt.args(["fmt", "--all", "--", "--check"]);
            run("cargo fmt --all -- --check", &mut fmt)?;

            let mut clippy = Command::new("cargo");
            clippy.args(["clippy", "--workspace", "--all-targets"]);
            run("cargo clippy --workspace --all-targets", &mut clippy)?;

            let mut test = Command::new("cargo");
            test.args(["test", "--workspace"]);
            run("cargo test --workspace", &mut test)?;
        }
        Commands::AssetCheck { dir, config } => asset_check(&dir, config.as_deref())?,
    }
    Ok(())
}

//=============================================================================
// asset-check 命令实现
//=============================================================================

/// 按类型分组的资源文件
#[derive(Default)]
struct AssetFiles {
    act: Vec<PathBuf>,
    anm: Vec<PathBuf>,
    gas: Vec<PathBuf>,
    audio: Vec<PathBuf>,
}

impl AssetFiles {
    fn total(&self) -> usize {
        self.act.len() + self.anm.len() + self.gas.len()
    }
}

/// 执行资源检查
///
/// 加载顺序为 ACT → 音频 → ANM → GAS，后者的引用依赖前者已注册。
fn asset_check(dir: &Path, config_path: Option<&Path>) -> anyhow::Result<()> {
    if !dir.is_dir() {
        anyhow::bail!("资源目录不存在: {}", dir.display());
    }
    let config = match config_path {
        Some(path) => RuntimeConfig::load(path)?,
        None => RuntimeConfig::default(),
    };

    let files = collect_asset_files(dir);
    if files.total() == 0 {
        eprintln!("未找到资源文件（.act / .anm / .gas）");
        return Ok(());
    }
    eprintln!("==> 检查 {} 个资源文件...\n", files.total());

    let mut resolver = MemoryResolver::new();
    let mut diagnostics = DiagnosticResult::new();

    for path in &files.act {
        let asset = path.display().to_string();
        let loaded = std::fs::read(path)
            .map_err(anyhow::Error::from)
            .and_then(|data| Ok(resolver.load_vertex_animation(&file_stem(path), &data)?));
        match loaded {
            Ok(anim) => info!(
                asset = %asset,
                frames = anim.frame_count(),
                meshes = anim.meshes().len(),
                seconds = anim.duration(config.vertex_frame_rate),
                "ACT 解码完成"
            ),
            Err(e) => diagnostics.push(Diagnostic::error(asset, format!("{e:#}"))),
        }
    }

    for path in &files.audio {
        resolver.insert_audio(&file_stem(path));
    }

    let mut animations = Vec::new();
    for path in &files.anm {
        let Some(text) = read_text(path, &mut diagnostics) else {
            continue;
        };
        let asset = path.display().to_string();
        let mut parser = TimelineParser::new(&resolver);
        let anim = parser.parse(&file_stem(path), &text);
        for warning in parser.warnings() {
            diagnostics.push(Diagnostic::from_parse_error(&asset, warning));
        }
        diagnostics.merge(relabel(analyze_animation(&anim), &asset));
        animations.push(Arc::new(anim));
    }
    for anim in animations {
        resolver.insert_animation(anim);
    }

    for path in &files.gas {
        let Some(text) = read_text(path, &mut diagnostics) else {
            continue;
        };
        let asset = path.display().to_string();
        let mut parser = GasParser::new(&resolver);
        let script = parser.parse(&file_stem(path), &text);
        for warning in parser.warnings() {
            diagnostics.push(Diagnostic::from_parse_error(&asset, warning));
        }
        diagnostics.merge(relabel(analyze_script(&script), &asset));
        debug!(asset = %asset, nodes = script.node_count(), "GAS 解析完成");
    }

    print_check_result(files.total(), &diagnostics);

    if diagnostics.has_errors() {
        anyhow::bail!("资源检查发现错误");
    }
    Ok(())
}

/// 收集目录下的资源文件，按路径排序
fn collect_asset_files(dir: &Path) -> AssetFiles {
    let mut files = AssetFiles::default();
    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.into_path();
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "act" => files.act.push(path),
            "anm" => files.anm.push(path),
            "gas" => files.gas.push(path),
            e if AUDIO_EXTENSIONS.contains(&e) => files.audio.push(path),
            _ => {}
        }
    }
    files.act.sort();
    files.anm.sort();
    files.gas.sort();
    files
}

fn file_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    normalize_name(&name)
}

fn read_text(path: &Path, diagnostics: &mut DiagnosticResult) -> Option<String> {
    match std::fs::read(path) {
        // 旧资源不一定是 UTF-8
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            diagnostics.push(Diagnostic::error(
                path.display().to_string(),
                format!("无法读取文件 - {e}"),
            ));
            None
        }
    }
}

/// 分析结果里的资源名换成文件路径
fn relabel(mut result: DiagnosticResult, asset: &str) -> DiagnosticResult {
    for diagnostic in &mut result.diagnostics {
        diagnostic.asset = asset.to_string();
    }
    result
}

/// 输出检查结果
fn print_check_result(checked: usize, diagnostics: &DiagnosticResult) {
    eprintln!("─────────────────────────────────────────────────────");
    eprintln!("检查完成: {checked} 个资源");
    eprintln!();

    eprint!("{diagnostics}");

    let error_count = diagnostics.error_count();
    let warn_count = diagnostics.warn_count();

    eprintln!();
    if error_count > 0 {
        eprintln!("❌ {error_count} 个错误, {warn_count} 个警告");
    } else if warn_count > 0 {
        eprintln!("⚠️  0 个错误, {warn_count} 个警告");
    } else {
        eprintln!("✅ 检查通过，无错误");
    }
}
