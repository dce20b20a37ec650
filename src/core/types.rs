use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 支持的平台
///
/// 后端按原样保存平台名，未知的名字保留在 `Other` 中。
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    Windows,
    Android,
    Linux,
    Ios,
    MacOs,
    Other(String),
}

impl Platform {
    pub const KNOWN: [Platform; 5] = [
        Platform::Windows,
        Platform::Android,
        Platform::Linux,
        Platform::Ios,
        Platform::MacOs,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Platform::Windows => "Windows",
            Platform::Android => "Android",
            Platform::Linux => "Linux",
            Platform::Ios => "iOS",
            Platform::MacOs => "macOS",
            Platform::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Platform::Other(_))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Platform {
    fn from(name: String) -> Self {
        Platform::KNOWN
            .into_iter()
            .find(|platform| platform.as_str().eq_ignore_ascii_case(&name))
            .unwrap_or(Platform::Other(name))
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        match platform {
            Platform::Other(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("platform name is empty".to_string());
        }
        Ok(Platform::from(s.to_string()))
    }
}

/// 上传文件的类型，对应上传接口路径中的 `fileType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Image,
    Video,
    Platform,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Image => "image",
            FileType::Video => "video",
            FileType::Platform => "platform",
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FileType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "image" => Ok(FileType::Image),
            "video" => Ok(FileType::Video),
            "platform" => Ok(FileType::Platform),
            other => Err(format!("unknown file type: {other}")),
        }
    }
}

/// 作品
///
/// 字段名与后端 `work_config.json` 保持一致。
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Work {
    #[serde(rename = "作品ID", default)]
    pub id: String,
    #[serde(rename = "作品作品", default)]
    pub title: String,
    #[serde(rename = "作品描述", default)]
    pub description: String,
    #[serde(rename = "作者", default)]
    pub author: String,
    #[serde(rename = "作品版本号", default)]
    pub version: String,
    #[serde(rename = "作品分类", default)]
    pub category: String,
    #[serde(rename = "作品标签", default)]
    pub tags: Vec<String>,
    #[serde(rename = "支持平台", default)]
    pub platforms: BTreeSet<Platform>,
    #[serde(rename = "作品截图", default)]
    pub screenshots: Vec<String>,
    #[serde(rename = "作品封面", default)]
    pub cover: String,
    #[serde(rename = "作品视频", default)]
    pub videos: Vec<String>,
    #[serde(rename = "文件名称", default)]
    pub file_names: BTreeMap<Platform, Vec<String>>,
    #[serde(rename = "作品浏览量", default)]
    pub views: u64,
    #[serde(rename = "作品下载量", default)]
    pub downloads: u64,
    #[serde(rename = "作品点赞量", default)]
    pub likes: u64,
    #[serde(rename = "作品更新次数", default)]
    pub update_count: u64,
    #[serde(rename = "上传时间", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(rename = "更新时间", default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<NaiveDateTime>,

    /// 以下为后端拼好的相对资源路径，只读
    #[serde(rename = "图片链接", default, skip_serializing)]
    pub image_links: Vec<String>,
    #[serde(rename = "视频链接", default, skip_serializing)]
    pub video_links: Vec<String>,
    #[serde(rename = "下载链接", default, skip_serializing)]
    pub download_links: BTreeMap<Platform, Vec<String>>,
}

impl Work {
    /// 封面文件名，空字符串视为未设置
    pub fn cover(&self) -> Option<&str> {
        if self.cover.is_empty() {
            None
        } else {
            Some(&self.cover)
        }
    }
}

/// 创建作品时提交的字段
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct WorkDraft {
    #[serde(rename = "作品ID")]
    pub id: String,
    #[serde(rename = "作品作品")]
    pub title: String,
    #[serde(rename = "作品描述")]
    pub description: String,
    #[serde(rename = "作者", skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(rename = "作品版本号", skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(rename = "作品分类", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "作品标签")]
    pub tags: Vec<String>,
    #[serde(rename = "支持平台")]
    pub platforms: BTreeSet<Platform>,
}

impl From<&Work> for WorkDraft {
    fn from(work: &Work) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            id: work.id.clone(),
            title: work.title.clone(),
            description: work.description.clone(),
            author: non_empty(&work.author),
            version: non_empty(&work.version),
            category: non_empty(&work.category),
            tags: work.tags.clone(),
            platforms: work.platforms.clone(),
        }
    }
}

/// 网站设置，客户端只读
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(rename = "网站名字", default)]
    pub site_name: Option<String>,
    #[serde(rename = "网站描述", default)]
    pub description: Option<String>,
    #[serde(rename = "网站logo", default)]
    pub logo_url: Option<String>,
    #[serde(rename = "网站页尾", default)]
    pub footer: Option<String>,
    #[serde(rename = "站长", default)]
    pub owner: Option<String>,
    #[serde(rename = "联系邮箱", default)]
    pub contact_email: Option<String>,
    #[serde(rename = "备案号", default)]
    pub icp_number: Option<String>,
    #[serde(rename = "主题颜色", default)]
    pub theme_color: Option<String>,
    #[serde(rename = "每页作品数量", default)]
    pub works_per_page: Option<usize>,
    #[serde(rename = "启用搜索", default)]
    pub search_enabled: Option<bool>,
    #[serde(rename = "启用分类", default)]
    pub categories_enabled: Option<bool>,
}

impl Settings {
    pub const DEFAULT_PAGE_SIZE: usize = 9;

    pub fn page_size(&self) -> usize {
        self.works_per_page
            .filter(|size| *size > 0)
            .unwrap_or(Self::DEFAULT_PAGE_SIZE)
    }
}

/// `{success, data, total}` 列表响应
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ListResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Vec<T>,
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub message: Option<String>,
}

/// `{success, data}` 单条响应
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

/// 作品列表
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkList {
    pub works: Vec<Work>,
    pub total: usize,
}

impl From<ListResponse<Work>> for WorkList {
    fn from(resp: ListResponse<Work>) -> Self {
        let total = resp.total.unwrap_or(resp.data.len());
        Self {
            works: resp.data,
            total,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LikeResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub likes: u64,
}

/// 管理接口的通用写操作响应
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MutationResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub work_id: Option<String>,
}

/// 上传接口响应，成功时至少包含服务器生成的文件名
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UploadReceipt {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub file_size: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn work_deserializes_backend_fields() {
        let json = r#"{
            "作品ID": "aurora",
            "作品作品": "Aurora",
            "作品描述": "A tiny game",
            "作者": "smy",
            "作品版本号": "1.2.0",
            "作品分类": "游戏",
            "作品标签": ["rust", "game"],
            "上传时间": "2025-01-02T03:04:05.123456",
            "更新时间": "2025-02-03T04:05:06",
            "支持平台": ["Windows", "iOS"],
            "文件名称": {"Windows": ["aurora_windows.zip"]},
            "作品截图": ["image1.png", "image2.png"],
            "作品视频": [],
            "作品封面": "image1.png",
            "作品下载量": 4,
            "作品浏览量": 10,
            "作品点赞量": 2,
            "作品更新次数": 1,
            "图片链接": ["/api/image/aurora/image1.png", "/api/image/aurora/image2.png"],
            "下载链接": {"Windows": ["/api/download/aurora/Windows/aurora_windows.zip"]}
        }"#;

        let work: Work = serde_json::from_str(json).unwrap();
        assert_eq!(work.id, "aurora");
        assert_eq!(work.title, "Aurora");
        assert!(work.platforms.contains(&Platform::Ios));
        assert_eq!(work.file_names[&Platform::Windows], vec!["aurora_windows.zip"]);
        assert_eq!(work.cover(), Some("image1.png"));
        assert_eq!(work.likes, 2);
        assert!(work.created_at.is_some());
        assert_eq!(work.image_links.len(), 2);
    }

    #[test]
    fn derived_links_are_not_sent_back() {
        let work = Work {
            id: "w".into(),
            image_links: vec!["/api/image/w/image1.png".into()],
            ..Default::default()
        };
        let value = serde_json::to_value(&work).unwrap();
        assert!(value.get("图片链接").is_none());
        assert_eq!(value["作品ID"], "w");
    }

    #[test]
    fn unknown_platforms_are_kept() {
        let json = r#"{
            "作品ID": "site",
            "支持平台": ["Web", "windows"],
            "文件名称": {"Web": ["site.zip"]},
            "下载链接": {"Web": ["/api/download/site/Web/site.zip"]}
        }"#;

        let work: Work = serde_json::from_str(json).unwrap();
        let web = Platform::Other("Web".into());
        assert!(work.platforms.contains(&web));
        assert!(work.platforms.contains(&Platform::Windows));
        assert!(!web.is_known());
        assert_eq!(work.file_names[&web], vec!["site.zip"]);
        assert_eq!(work.download_links[&web].len(), 1);

        let value = serde_json::to_value(&work).unwrap();
        assert_eq!(value["支持平台"], serde_json::json!(["Windows", "Web"]));
        assert_eq!(value["文件名称"]["Web"][0], "site.zip");
    }

    #[test]
    fn settings_page_size_falls_back() {
        let settings: Settings = serde_json::from_str(r#"{"网站名字": "gallery", "每页作品数量": 0}"#).unwrap();
        assert_eq!(settings.site_name.as_deref(), Some("gallery"));
        assert_eq!(settings.page_size(), Settings::DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn platform_parses_case_insensitively() {
        assert_eq!("ios".parse::<Platform>().unwrap(), Platform::Ios);
        assert_eq!("macOS".parse::<Platform>().unwrap(), Platform::MacOs);
        assert_eq!("Web".parse::<Platform>().unwrap(), Platform::Other("Web".into()));
        assert!(" ".parse::<Platform>().is_err());
        assert_eq!("Video".parse::<FileType>().unwrap(), FileType::Video);
    }
}
