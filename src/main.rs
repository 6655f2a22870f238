/// opencv
/// https://docs.rs/opencv/latest/opencv/all.html
///
/// nalgebra
/// https://docs.rs/nalgebra/latest/nalgebra/
///
/// 两个程序：
///   calibrate  采集棋盘格视图 -> 标定 -> 写参数文件
///   augment    读参数文件 -> 实时估计位姿 -> 叠加坐标轴和金字塔
extern crate opencv;

mod app;
mod calibration;
mod camera;
mod capture;
mod config;
mod error;
mod pattern;
mod pose;
mod projector;
mod vision;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::capture::{CameraCapture, ImageFiles};
use crate::config::AppConfig;

/// 棋盘格相机标定与 AR 叠加
#[derive(Debug, Parser)]
#[command(name = "chessboard-ar", version)]
struct Cli {
    /// JSON 配置文件，命令行参数优先
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 按 's' 保存当前视图，按 'q' 结束并标定
    Calibrate {
        #[command(flatten)]
        common: CommonArgs,
        /// 把确认过的角点写成 CSV
        #[arg(long)]
        export_corners: Option<PathBuf>,
        /// 标定后逐张显示标定图像
        #[arg(long)]
        review: bool,
        /// 从图像目录读取，不打开相机
        #[arg(long)]
        image_dir: Option<PathBuf>,
    },
    /// 按 'q' 退出
    Augment {
        #[command(flatten)]
        common: CommonArgs,
    },
}

#[derive(Debug, Args)]
struct CommonArgs {
    #[arg(long)]
    camera: Option<i32>,
    /// 内角点列数
    #[arg(long)]
    columns: Option<u32>,
    /// 内角点行数
    #[arg(long)]
    rows: Option<u32>,
    /// 相机参数文件
    #[arg(long)]
    params: Option<PathBuf>,
}

impl CommonArgs {
    fn apply(self, config: &mut AppConfig) {
        if let Some(camera) = self.camera {
            config.camera_index = camera;
        }
        if let Some(columns) = self.columns {
            config.board_columns = columns;
        }
        if let Some(rows) = self.rows {
            config.board_rows = rows;
        }
        if let Some(params) = self.params {
            config.params_path = params;
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => AppConfig::read_from_json(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Command::Calibrate {
            common,
            export_corners,
            review,
            image_dir,
        } => {
            common.apply(&mut config);
            if export_corners.is_some() {
                config.export_corners = export_corners;
            }
            config.review_images |= review;
            if image_dir.is_some() {
                config.image_dir = image_dir;
            }
            log::info!("config: {:?}", config);

            match &config.image_dir {
                Some(dir) => {
                    let mut files = ImageFiles::from_dir(dir)?;
                    app::run_calibration(&config, &mut files, true)
                }
                None => {
                    let mut camera = CameraCapture::open(config.camera_index)?;
                    let result = app::run_calibration(&config, &mut camera, false);
                    camera.release()?;
                    result
                }
            }
        }
        Command::Augment { common } => {
            common.apply(&mut config);
            log::info!("config: {:?}", config);

            let mut camera = CameraCapture::open(config.camera_index)?;
            let result = app::run_augment(&config, &mut camera);
            camera.release()?;
            result
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_nanos()
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        log::error!("{:#}", e);
        return Err(e);
    }
    Ok(())
}
