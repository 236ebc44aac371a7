//! Tag plan resolution
//!
//! A tag plan lists, for one stack, the base compose file followed by every
//! merged tag with the files found for it. Files are searched in:
//!
//! 1. the stack directory
//! 2. the app directory
//! 3. the plugins packaged with the app's source
//! 4. the project plugins directory

use std::path::{Path, PathBuf};

use crate::domain::{merge_tags, Stack, Tag};
use crate::error::PaasifyError;
use crate::plugin::TransformStep;
use crate::storage::{lookup_candidates, Project};

/// Base compose file names, in lookup order
pub const BASE_COMPOSE_FILES: [&str; 2] = ["docker-compose.yml", "docker-compose.yaml"];

/// Compose fragment names for a tag
pub fn compose_patterns(tag: &str) -> Vec<String> {
    vec![
        format!("docker-compose.{}.yml", tag),
        format!("docker-compose.{}.yaml", tag),
        format!("paasify/{}.yml", tag),
        format!("paasify/{}.yaml", tag),
    ]
}

/// Transform script names for a tag
pub fn transform_patterns(tag: &str) -> Vec<String> {
    vec![
        format!("{}.jsonnet", tag),
        format!(".paasify/plugins/{}.jsonnet", tag),
    ]
}

/// One entry of a tag plan
#[derive(Debug, Clone, PartialEq)]
pub struct TagPlanEntry {
    /// `None` for the base entry
    pub tag: Option<Tag>,

    /// First compose candidate, if any
    pub compose_file: Option<PathBuf>,

    /// First transform candidate, if any
    pub transform_script: Option<PathBuf>,

    /// Every compose candidate, in priority order
    pub compose_candidates: Vec<PathBuf>,

    /// Every transform candidate, in priority order
    pub transform_candidates: Vec<PathBuf>,
}

impl TagPlanEntry {
    fn new(tag: Option<Tag>, compose: Vec<PathBuf>, transform: Vec<PathBuf>) -> Self {
        Self {
            tag,
            compose_file: compose.first().cloned(),
            transform_script: transform.first().cloned(),
            compose_candidates: compose,
            transform_candidates: transform,
        }
    }

    /// Display name: the tag name, or `base`
    pub fn name(&self) -> &str {
        self.tag.as_ref().map(|t| t.name.as_str()).unwrap_or("base")
    }

    /// True when the tag only acts through its transform script
    pub fn is_transform_only(&self) -> bool {
        self.compose_file.is_none() && self.transform_script.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.compose_file.is_none() && self.transform_script.is_none()
    }
}

/// Resolved files for a stack
#[derive(Debug, Clone, PartialEq)]
pub struct TagPlan {
    pub stack: String,
    pub app_dir: Option<PathBuf>,
    pub search_dirs: Vec<PathBuf>,

    /// Base entry first, then tags in merged order
    pub entries: Vec<TagPlanEntry>,
}

impl TagPlan {
    pub fn base(&self) -> &TagPlanEntry {
        &self.entries[0]
    }

    /// The stack's primary compose file
    pub fn base_compose_file(&self) -> &Path {
        self.base()
            .compose_file
            .as_deref()
            .unwrap_or_else(|| Path::new(BASE_COMPOSE_FILES[0]))
    }

    /// Tag entries, without the base entry
    pub fn tags(&self) -> &[TagPlanEntry] {
        &self.entries[1..]
    }

    /// Fails on the first tag without any file
    pub fn ensure_complete(&self) -> Result<(), PaasifyError> {
        match self.tags().iter().find(|e| e.is_empty()) {
            Some(entry) => Err(PaasifyError::MissingTag {
                tag: entry.name().to_string(),
                stack: self.stack.clone(),
                dirs: self.search_dirs.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Compose files to merge: the base file, then every tag fragment
    pub fn compose_files(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .filter_map(|e| e.compose_file.clone())
            .collect()
    }

    /// Every tag with a transform script, in plan order
    pub fn scripts(&self) -> Vec<(&Tag, &Path)> {
        self.tags()
            .iter()
            .filter_map(|e| Some((e.tag.as_ref()?, e.transform_script.as_deref()?)))
            .collect()
    }

    /// Transform chain steps: tags with a script and no compose fragment
    pub fn transform_steps(&self) -> Vec<TransformStep<'_>> {
        self.tags()
            .iter()
            .filter(|e| e.is_transform_only())
            .filter_map(|e| {
                Some(TransformStep {
                    tag: e.tag.as_ref()?,
                    script: e.transform_script.as_deref()?,
                })
            })
            .collect()
    }
}

/// Resolves tag plans against a project's layout
pub struct TagResolver<'a> {
    project: &'a Project,
}

impl<'a> TagResolver<'a> {
    pub fn new(project: &'a Project) -> Self {
        Self { project }
    }

    /// App directory of a stack, if it references an app
    pub fn app_dir(&self, stack: &Stack) -> Option<PathBuf> {
        stack.app.as_ref().map(|app| self.project.app_dir(app))
    }

    /// Directories searched for tag files, in priority order
    pub fn search_dirs(&self, stack: &Stack) -> Vec<PathBuf> {
        let mut dirs = vec![stack.dir.clone()];
        if let Some(app) = &stack.app {
            dirs.push(self.project.app_dir(app));
            dirs.push(self.project.source(&app.source).plugins_dir());
        }
        dirs.push(self.project.plugins_dir());

        let mut unique: Vec<PathBuf> = Vec::new();
        for dir in dirs {
            if !unique.contains(&dir) {
                unique.push(dir);
            }
        }
        unique
    }

    /// Merged tags of a stack, with project defaults applied
    pub fn tags(&self, stack: &Stack) -> Vec<Tag> {
        merge_tags(stack.tags.over(self.project.tags()))
    }

    /// Resolves the plan of a stack
    ///
    /// A tag without files is kept in the plan; see [`TagPlan::ensure_complete`].
    pub fn resolve(&self, stack: &Stack) -> Result<TagPlan, PaasifyError> {
        let app_dir = self.app_dir(stack);

        let mut base_dirs = vec![stack.dir.clone()];
        base_dirs.extend(app_dir.clone());
        let base_patterns: Vec<String> = BASE_COMPOSE_FILES.iter().map(|s| s.to_string()).collect();
        let base = lookup_candidates(&base_dirs, &base_patterns);
        if base.is_empty() {
            return Err(PaasifyError::MissingComposeFile {
                stack: stack.name.clone(),
                dirs: base_dirs,
            });
        }

        let search_dirs = self.search_dirs(stack);
        let mut entries = vec![TagPlanEntry::new(None, base, Vec::new())];

        for tag in self.tags(stack) {
            let compose = lookup_candidates(&search_dirs, &compose_patterns(&tag.name));
            let transform = lookup_candidates(&search_dirs, &transform_patterns(&tag.name));
            entries.push(TagPlanEntry::new(Some(tag), compose, transform));
        }

        Ok(TagPlan {
            stack: stack.name.clone(),
            app_dir,
            search_dirs,
            entries,
        })
    }
}
