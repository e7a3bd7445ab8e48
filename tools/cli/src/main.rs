//! 荧光显微分割与感染度量的命令行入口.

use std::error::Error;
use std::fs;
use std::num::ParseIntError;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use ome_berry::consts::{channel, DEFAULT_SIGMA};
use ome_berry::render::{self, ImgWriteRaw, ImgWriteVis};
use ome_berry::store;
use ome_berry::{measure_infection, par_segment, pipeline, TimeSelection, Volume};

/// OME 风格荧光显微体数据的细胞核分割与感染度量工具.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// 输出更详细的日志.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 对若干时间帧执行细胞核分割, 导出 PNG / GIF / zarr 标签.
    Segment(SegmentArgs),

    /// 对单帧执行区域强度度量与感染分类, 导出 CSV.
    Infection(InfectionArgs),

    /// 列出存储层级下的所有数组.
    List(StoreArgs),
}

/// 数据来源.
#[derive(Args)]
struct StoreArgs {
    /// zarr 存储根目录. 缺省时依次尝试 `$OME_BERRY_STORE` 与 `~/microscopy`.
    #[arg(long)]
    store: Option<PathBuf>,

    /// 存储内的数组路径.
    #[arg(long, default_value = "0")]
    group: String,
}

impl StoreArgs {
    fn dir(&self) -> PathBuf {
        self.store
            .clone()
            .unwrap_or_else(utils::loader::store_dir_from_env_or_home)
    }

    /// 加载体数据. 显式 `--store` 优先, 否则走环境变量与主目录约定.
    fn volume(&self) -> Result<Volume, store::StoreError> {
        match &self.store {
            Some(root) => store::load_volume(root, &self.group),
            None => utils::loader::volume_from_env_or_home(&self.group),
        }
    }

    /// 列出存储内的全部数组.
    fn arrays(&self) -> Result<Vec<String>, store::StoreError> {
        match &self.store {
            Some(root) => store::list_arrays(root),
            None => utils::loader::arrays_from_env_or_home(),
        }
    }
}

#[derive(Args)]
struct SegmentArgs {
    #[command(flatten)]
    source: StoreArgs,

    /// 分割通道.
    #[arg(long, default_value_t = channel::NUCLEI)]
    channel: usize,

    /// 高斯去噪强度.
    #[arg(long, default_value_t = DEFAULT_SIGMA)]
    sigma: f32,

    /// 逗号分隔的时间索引列表 (如 `3,1,2`), 保序处理. 缺省处理全部帧.
    #[arg(long)]
    times: Option<String>,

    /// 单帧 PNG 输出目录.
    #[arg(long, default_value = "results")]
    out_dir: PathBuf,

    /// 以 16 位原始标签保存 PNG, 不做伪彩色渲染.
    #[arg(long)]
    raw: bool,

    /// 把整个序列编码为 GIF 动画保存到该路径.
    #[arg(long)]
    gif: Option<PathBuf>,

    /// GIF 帧率.
    #[arg(long, default_value_t = 1)]
    fps: u32,

    /// 把标签体数据以 zarr 数组写回该根目录 (数组路径为 `labels/{group}`).
    #[arg(long)]
    save_store: Option<PathBuf>,

    /// 并行线程数. 缺省使用全部可用核心.
    #[arg(long)]
    threads: Option<usize>,
}

#[derive(Args)]
struct InfectionArgs {
    #[command(flatten)]
    source: StoreArgs,

    /// 时间索引.
    #[arg(long, default_value_t = 0)]
    time: usize,

    /// 细胞核通道 (分割输入).
    #[arg(long, default_value_t = channel::NUCLEI)]
    nuclei_channel: usize,

    /// 病毒信号通道 (强度来源).
    #[arg(long, default_value_t = channel::VIRUS)]
    signal_channel: usize,

    /// 度量表 (CSV) 输出路径.
    #[arg(long, default_value = "results/infection_metrics.csv")]
    out: PathBuf,

    /// 把感染质心标注图保存到该路径.
    #[arg(long)]
    annotate: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let level = if cli.verbose {
        log::Level::Debug
    } else {
        log::Level::Info
    };
    simple_logger::init_with_level(level)?;

    match cli.command {
        Command::Segment(args) => run_segment(args),
        Command::Infection(args) => run_infection(args),
        Command::List(args) => run_list(args),
    }
}

/// 解析逗号分隔的时间索引列表. 空串等价于空集合.
fn parse_times(list: &str) -> Result<TimeSelection, ParseIntError> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<Result<Vec<usize>, _>>()
        .map(TimeSelection::from)
}

fn run_segment(args: SegmentArgs) -> Result<(), Box<dyn Error>> {
    if let Some(n) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build_global()?;
    }
    log::info!(
        "thread pool: {} worker(s)",
        args.threads.unwrap_or_else(utils::cpus)
    );

    let volume = args.source.volume()?;
    let times = match &args.times {
        Some(list) => parse_times(list)?,
        None => TimeSelection::All,
    };
    let stack = par_segment(&volume, args.channel, args.sigma, &times)?;

    fs::create_dir_all(&args.out_dir)?;
    for (t, map) in stack.iter() {
        let path = args.out_dir.join(format!("seg_t{t:03}.png"));
        if args.raw {
            map.save_raw(&path)?;
        } else {
            map.save(&path)?;
        }
    }
    if let Some(gif) = &args.gif {
        render::save_video(stack.maps().map(render::render_frame), args.fps, gif)?;
    }
    if let Some(root) = &args.save_store {
        let group = format!("labels/{}", args.source.group);
        store::write_label_volume(root, &group, &stack)?;
    }

    utils::sep();
    println!(
        "segmented {} frame(s) -> {}",
        stack.len(),
        args.out_dir.display()
    );
    Ok(())
}

fn run_infection(args: InfectionArgs) -> Result<(), Box<dyn Error>> {
    let volume = args.source.volume()?;
    let table = measure_infection(
        &volume,
        args.time,
        args.nuclei_channel,
        args.signal_channel,
    )?;

    if let Some(parent) = args.out.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    table.save_csv(&args.out)?;

    if let Some(path) = &args.annotate {
        let projection = pipeline::project_frame(&volume, args.time, args.signal_channel)?;
        render::annotate_infected(projection.view(), &table).save(path)?;
    }

    utils::sep();
    println!(
        "t={}: {} region(s), {} infected -> {}",
        args.time,
        table.len(),
        table.infected_count(),
        args.out.display()
    );
    Ok(())
}

fn run_list(args: StoreArgs) -> Result<(), Box<dyn Error>> {
    let arrays = args.arrays()?;
    if arrays.is_empty() {
        println!("no arrays under {}", args.dir().display());
    }
    for array in arrays {
        println!("{array}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_list_forms() {
        assert_eq!(
            parse_times("3,1,2").unwrap(),
            TimeSelection::from(vec![3, 1, 2])
        );
        assert_eq!(
            parse_times(" 4 , 4 ").unwrap(),
            TimeSelection::from(vec![4, 4])
        );
        assert_eq!(parse_times("").unwrap(), TimeSelection::from(vec![]));
        assert!(parse_times("1,x").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn store_resolution_prefers_explicit_root() {
        let scratch = std::env::temp_dir().join(format!("ome-berry-cli-{}", std::process::id()));
        if scratch.exists() {
            fs::remove_dir_all(&scratch).unwrap();
        }
        let filled = scratch.join("filled");
        let vacant = scratch.join("vacant");
        fs::create_dir_all(filled.join("0")).unwrap();
        fs::create_dir_all(&vacant).unwrap();

        // 手写一个最小的 raw `<u2` 数组.
        let meta = r#"{"zarr_format": 2, "shape": [1, 1, 1, 2, 2], "chunks": [1, 1, 1, 2, 2], "dtype": "<u2", "compressor": null, "fill_value": 0, "order": "C", "filters": null}"#;
        fs::write(filled.join("0/.zarray"), meta).unwrap();
        let bytes: Vec<u8> = [7u16, 8, 9, 10].iter().flat_map(|v| v.to_le_bytes()).collect();
        fs::write(filled.join("0/0.0.0.0.0"), bytes).unwrap();

        std::env::set_var("OME_BERRY_STORE", &filled);
        let implied = StoreArgs {
            store: None,
            group: "0".to_owned(),
        };
        assert_eq!(implied.dir(), filled);
        assert_eq!(implied.arrays().unwrap(), vec!["0".to_owned()]);
        let volume = implied.volume().unwrap();
        assert_eq!(volume.shape(), (1, 1, 1, 2, 2));
        assert_eq!(volume[(0, 0, 0, 1, 0)], 9.0);

        // 显式 --store 优先于环境变量.
        let explicit = StoreArgs {
            store: Some(vacant.clone()),
            group: "0".to_owned(),
        };
        assert_eq!(explicit.dir(), vacant);
        assert!(explicit.arrays().unwrap().is_empty());
        assert!(explicit.volume().is_err());

        fs::remove_dir_all(&scratch).unwrap();
    }
}
