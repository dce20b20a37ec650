use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::info;
use showcase::config::{Config, DEFAULT_CONFIG_PATH};
use showcase::core::{FileType, Platform, UploadStatus, Work};
use showcase::uploaders::{MultipartTransport, ResilientUploader, UploadFile};
use showcase::utils::{format_duration, format_speed, page_slice, total_pages};
use showcase::{AdminClient, ApiClient, UploadBoard, WorkEditor, telemetry};

#[derive(Parser, Debug)]
#[command(name = "showcase", version, about = "作品展示站客户端")]
struct Cli {
    /// 配置文件路径
    #[arg(long, short, env = "SHOWCASE_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 网站设置
    Settings,
    /// 分页列出作品
    Works {
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// 查看作品详情及图片、视频、下载地址
    Show { id: String },
    /// 下载作品某个平台的文件
    Download {
        work_id: String,
        #[arg(value_parser = parse_platform)]
        platform: Platform,
        /// 只下载这个文件，默认下载该平台的全部文件
        #[arg(long)]
        file: Option<String>,
        /// 保存目录
        #[arg(long, short, default_value = ".")]
        out: PathBuf,
    },
    /// 列出分类
    Categories,
    /// 按关键字和分类搜索
    Search {
        #[arg(long, short, default_value = "")]
        query: String,
        #[arg(long, short, default_value = "")]
        category: String,
    },
    /// 点赞
    Like { id: String },
    /// 管理操作，需要管理员凭据
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// 校验凭据
    Verify,
    /// 列出所有作品
    Works,
    /// 创建作品
    Create(CreateArgs),
    /// 删除作品
    Delete { id: String },
    /// 上传文件到作品
    Upload {
        work_id: String,
        #[arg(value_parser = parse_file_type)]
        file_type: FileType,
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[arg(long, value_parser = parse_platform)]
        platform: Option<Platform>,
    },
    /// 删除作品中的文件
    DeleteFile {
        work_id: String,
        #[arg(value_parser = parse_file_type)]
        file_type: FileType,
        filename: String,
        #[arg(long, value_parser = parse_platform)]
        platform: Option<Platform>,
    },
    /// 设置封面
    SetCover { work_id: String, filename: String },
    /// 启用或停用平台，停用时同时移除该平台的文件记录
    Platform {
        work_id: String,
        #[arg(value_parser = parse_platform)]
        platform: Platform,
        #[arg(long)]
        disable: bool,
    },
}

#[derive(Args, Debug)]
struct CreateArgs {
    #[arg(long)]
    id: String,
    #[arg(long)]
    title: String,
    #[arg(long, default_value = "")]
    description: String,
    #[arg(long, default_value = "")]
    author: String,
    #[arg(long, default_value = "")]
    version: String,
    #[arg(long, default_value = "")]
    category: String,
    #[arg(long = "tag")]
    tags: Vec<String>,
    #[arg(long = "platform", value_parser = parse_platform)]
    platforms: Vec<Platform>,
}

fn parse_file_type(s: &str) -> std::result::Result<FileType, String> {
    s.parse()
}

fn parse_platform(s: &str) -> std::result::Result<Platform, String> {
    s.parse()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env(&cli.config)
        .with_context(|| format!("failed to load config from {}", cli.config.display()))?;
    telemetry::init(&config.log_level)?;

    match cli.command {
        Command::Settings => print_json(&ApiClient::new(&config)?.settings().await?),
        Command::Works { page } => list_page(&config, page).await,
        Command::Show { id } => show_work(&config, &id).await,
        Command::Download {
            work_id,
            platform,
            file,
            out,
        } => download(&config, &work_id, &platform, file, &out).await,
        Command::Categories => print_json(&ApiClient::new(&config)?.categories().await?),
        Command::Search { query, category } => {
            print_json(&ApiClient::new(&config)?.search(&query, &category).await?)
        }
        Command::Like { id } => {
            let likes = ApiClient::new(&config)?.like(&id).await?;
            println!("{id}: {likes} likes");
            Ok(())
        }
        Command::Admin(command) => run_admin(&config, command).await,
    }
}

async fn list_page(config: &Config, page: usize) -> Result<()> {
    let client = ApiClient::new(config)?;
    let page_size = client.settings().await?.page_size();
    let list = client.works().await?;

    let pages = total_pages(list.works.len(), page_size);
    let works = page_slice(&list.works, page, page_size);
    for work in works {
        println!("{:<20} {:<30} {:>6} likes", work.id, work.title, work.likes);
    }
    println!("page {}/{} ({} works)", page.max(1).min(pages.max(1)), pages.max(1), list.total);
    Ok(())
}

async fn show_work(config: &Config, id: &str) -> Result<()> {
    let client = ApiClient::new(config)?;
    let work = client.work(id).await?;
    let links = client.media_links(&work)?;
    print_json(&json!({ "work": work, "links": links }))
}

async fn download(
    config: &Config,
    work_id: &str,
    platform: &Platform,
    file: Option<String>,
    out: &Path,
) -> Result<()> {
    let client = ApiClient::new(config)?;
    let files = match file {
        Some(file) => vec![file],
        None => {
            let work = client.work(work_id).await?;
            work.file_names.get(platform).cloned().unwrap_or_default()
        }
    };
    if files.is_empty() {
        bail!("{work_id} has no files for {platform}");
    }

    tokio::fs::create_dir_all(out)
        .await
        .with_context(|| format!("failed to create {}", out.display()))?;
    for file in &files {
        let path = client.download(work_id, platform, file, out).await?;
        println!("{}", path.display());
    }
    Ok(())
}

async fn run_admin(config: &Config, command: AdminCommand) -> Result<()> {
    let admin = AdminClient::from_config(config)?;
    let uploader = || {
        ResilientUploader::new(MultipartTransport::new(admin.clone()), config.upload.retry_policy())
    };

    match command {
        AdminCommand::Verify => {
            admin.verify().await?;
            println!("admin token accepted");
        }
        AdminCommand::Works => print_json(&admin.works().await?)?,
        AdminCommand::Create(args) => {
            let work = Work {
                id: args.id,
                title: args.title,
                description: args.description,
                author: args.author,
                version: args.version,
                category: args.category,
                tags: args.tags,
                platforms: args.platforms.into_iter().collect(),
                ..Default::default()
            };
            let mut editor = WorkEditor::create(admin.clone(), uploader(), work);
            editor.save().await?;
            print_json(editor.work())?;
        }
        AdminCommand::Delete { id } => {
            admin.delete_work(&id).await?;
            println!("deleted {id}");
        }
        AdminCommand::Upload {
            work_id,
            file_type,
            files,
            platform,
        } => {
            let mut uploads = Vec::with_capacity(files.len());
            for path in &files {
                uploads.push(UploadFile::open(path).await?);
            }

            let mut editor = WorkEditor::load(admin.clone(), uploader(), &work_id)
                .await?
                .with_prune_after(config.upload.prune_after());
            let renderer = Renderer::spawn(editor.board().clone())?;
            let report = editor.upload_files(file_type, platform, uploads).await;
            renderer.finish();

            let report = report?;
            for (key, receipt) in &report.uploaded {
                println!("{key} -> {}", receipt.filename);
            }
            if let Some((key, err)) = report.failed {
                bail!("{key}: {err}");
            }
        }
        AdminCommand::DeleteFile {
            work_id,
            file_type,
            filename,
            platform,
        } => {
            let mut editor = WorkEditor::load(admin.clone(), uploader(), &work_id).await?;
            editor.delete_file(file_type, &filename, platform).await?;
            info!("deleted {} from {}", filename, work_id);
            print_json(editor.work())?;
        }
        AdminCommand::SetCover { work_id, filename } => {
            let mut editor = WorkEditor::load(admin.clone(), uploader(), &work_id).await?;
            editor.set_cover(&filename)?;
            editor.save().await?;
            println!("cover of {work_id} set to {filename}");
        }
        AdminCommand::Platform {
            work_id,
            platform,
            disable,
        } => {
            let mut editor = WorkEditor::load(admin.clone(), uploader(), &work_id).await?;
            editor.toggle_platform(platform, !disable);
            editor.save().await?;
            print_json(&editor.work().platforms)?;
        }
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// 根据上传面板的变化刷新终端进度条
struct Renderer {
    board: UploadBoard,
    bars: Arc<Mutex<BoardBars>>,
    task: JoinHandle<()>,
}

impl Renderer {
    fn spawn(board: UploadBoard) -> Result<Self> {
        let style = ProgressStyle::with_template("{prefix:20} [{bar:30}] {bytes}/{total_bytes} {msg}")?
            .progress_chars("=> ");
        let bars = Arc::new(Mutex::new(BoardBars {
            multi: MultiProgress::new(),
            style,
            bars: HashMap::new(),
        }));

        let mut rx = board.subscribe();
        let task_board = board.clone();
        let task_bars = bars.clone();
        let task = tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                task_bars.lock().render(&task_board);
            }
        });

        Ok(Self { board, bars, task })
    }

    fn finish(self) {
        self.task.abort();
        let mut bars = self.bars.lock();
        bars.render(&self.board);
        for bar in bars.bars.values().filter(|bar| !bar.is_finished()) {
            bar.abandon();
        }
    }
}

struct BoardBars {
    multi: MultiProgress,
    style: ProgressStyle,
    bars: HashMap<String, ProgressBar>,
}

impl BoardBars {
    fn render(&mut self, board: &UploadBoard) {
        for (key, item) in board.snapshot() {
            let bar = self.bars.entry(key).or_insert_with(|| {
                let bar = self.multi.add(ProgressBar::new(item.file_size));
                bar.set_style(self.style.clone());
                bar.set_prefix(item.file_name.clone());
                bar
            });
            if bar.is_finished() {
                continue;
            }

            bar.set_length(item.file_size);
            bar.set_position(item.bytes_uploaded);
            match &item.status {
                UploadStatus::Uploading => {
                    let eta = item.eta.map(format_duration).unwrap_or_else(|| "-".to_string());
                    bar.set_message(format!("{} eta {}", format_speed(item.speed), eta));
                }
                UploadStatus::Retrying { message } => bar.set_message(message.clone()),
                UploadStatus::Completed => bar.finish_with_message("done"),
                UploadStatus::Error(reason) => bar.abandon_with_message(reason.clone()),
            }
        }
    }
}
