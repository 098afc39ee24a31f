// Payload dictionaries for sqlprobe
// Newline-delimited payload lists, addressed by category or by path

use crate::error::ProbeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use walkdir::WalkDir;

/// Bundled dictionary categories, each backed by one file in the dictionary directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DictionaryCategory {
    ErrorBased,
    GenericSqli,
    TimeBased,
    UnionSelect,
    BooleanBased,
    GenericBlind,
    MysqlBlindInsert,
    MysqlBlindOrderBy,
    MysqlBlindWhere,
}

impl DictionaryCategory {
    pub const ALL: [DictionaryCategory; 9] = [
        DictionaryCategory::ErrorBased,
        DictionaryCategory::GenericSqli,
        DictionaryCategory::TimeBased,
        DictionaryCategory::UnionSelect,
        DictionaryCategory::BooleanBased,
        DictionaryCategory::GenericBlind,
        DictionaryCategory::MysqlBlindInsert,
        DictionaryCategory::MysqlBlindOrderBy,
        DictionaryCategory::MysqlBlindWhere,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            DictionaryCategory::ErrorBased => "Generic_ErrorBased.txt",
            DictionaryCategory::GenericSqli => "Generic_SQLI.txt",
            DictionaryCategory::TimeBased => "Generic_TimeBased.txt",
            DictionaryCategory::UnionSelect => "Generic_UnionSelect.txt",
            DictionaryCategory::BooleanBased => "Generic_BooleanBased.txt",
            DictionaryCategory::GenericBlind => "GenericBlind.txt",
            DictionaryCategory::MysqlBlindInsert => "payloads-sql-blind-MySQL-INSERT.txt",
            DictionaryCategory::MysqlBlindOrderBy => "payloads-sql-blind-MySQL-ORDER_BY.txt",
            DictionaryCategory::MysqlBlindWhere => "payloads-sql-blind-MySQL-WHERE.txt",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DictionaryCategory::ErrorBased => "error-based",
            DictionaryCategory::GenericSqli => "generic-sqli",
            DictionaryCategory::TimeBased => "time-based",
            DictionaryCategory::UnionSelect => "union-select",
            DictionaryCategory::BooleanBased => "boolean-based",
            DictionaryCategory::GenericBlind => "generic-blind",
            DictionaryCategory::MysqlBlindInsert => "mysql-blind-insert",
            DictionaryCategory::MysqlBlindOrderBy => "mysql-blind-order-by",
            DictionaryCategory::MysqlBlindWhere => "mysql-blind-where",
        }
    }
}

impl fmt::Display for DictionaryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DictionaryCategory {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DictionaryCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ProbeError::Config(format!("unknown dictionary category: {}", s)))
    }
}

/// A dictionary identifier: a bundled category name, or any other file path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DictionaryRef {
    Category(DictionaryCategory),
    Path(PathBuf),
}

impl FromStr for DictionaryRef {
    type Err = ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<DictionaryCategory>() {
            Ok(category) => Ok(DictionaryRef::Category(category)),
            Err(_) if !s.trim().is_empty() => Ok(DictionaryRef::Path(PathBuf::from(s))),
            Err(e) => Err(e),
        }
    }
}

impl From<DictionaryCategory> for DictionaryRef {
    fn from(category: DictionaryCategory) -> Self {
        DictionaryRef::Category(category)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dictionary {
    /// File stem, reported as the active process in progress events
    pub name: String,
    pub path: PathBuf,
}

impl Dictionary {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self { name, path }
    }

    /// Resolve a reference against the dictionary directory. Relative paths stay relative
    /// to the working directory.
    pub fn resolve(reference: &DictionaryRef, dictionary_dir: &Path) -> Self {
        match reference {
            DictionaryRef::Category(category) => {
                Self::from_path(dictionary_dir.join(category.file_name()))
            }
            DictionaryRef::Path(path) => Self::from_path(path.clone()),
        }
    }

    pub async fn load(&self) -> Result<Payloads, ProbeError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| ProbeError::DictionaryNotFound {
                path: self.path.clone(),
                source,
            })?;
        Ok(Payloads { content })
    }
}

/// The payloads of one dictionary. Iteration is lazy over the loaded text and can be
/// restarted by calling `iter` again.
#[derive(Debug, Clone)]
pub struct Payloads {
    content: String,
}

impl Payloads {
    pub fn from_text(content: impl Into<String>) -> Self {
        Self { content: content.into() }
    }

    /// Empty lines are dropped; whitespace-only lines are kept verbatim.
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.content
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .filter(|line| !line.is_empty())
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// List every `.txt` dictionary below `dir`, sorted by path.
pub fn discover(dir: &Path) -> Vec<Dictionary> {
    let mut found: Vec<Dictionary> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().map_or(false, |ext| ext == "txt"))
        .map(|e| Dictionary::from_path(e.into_path()))
        .collect();
    found.sort_by(|a, b| a.path.cmp(&b.path));
    found
}
