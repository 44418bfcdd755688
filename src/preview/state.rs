//! Render pipeline state management

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::metrics::{WidthPolicy, target_display_width};

/// Which pages the pipeline renders once a document is loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderPolicy {
    /// Render every page as soon as the document loads
    #[default]
    Eager,
    /// Render only pages reported visible by the host
    Lazy,
}

/// Document lifecycle
#[derive(Clone, Debug, PartialEq)]
pub enum Phase {
    /// No source set
    Idle,
    /// Source handed to the loader
    Loading,
    /// Page count known, pages render per policy
    Loaded { page_count: u32 },
    /// Load failed; terminal until a new source is opened
    Failed { reason: String },
}

/// Current state of the render pipeline
#[derive(Clone, Debug)]
pub struct PipelineState {
    pub phase: Phase,

    /// Last measured container width
    pub container_width: f32,

    /// Width pages are rendered at, derived from the container width
    pub target_width: f32,

    pub policy: RenderPolicy,
    pub width_policy: WidthPolicy,

    /// Pages the host reports as visible
    pub visible: BTreeSet<u32>,
}

impl PipelineState {
    #[must_use]
    pub fn new(policy: RenderPolicy, width_policy: WidthPolicy) -> Self {
        Self {
            phase: Phase::Idle,
            container_width: 0.0,
            target_width: target_display_width(0.0, &width_policy),
            policy,
            width_policy,
            visible: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn page_count(&self) -> Option<u32> {
        match self.phase {
            Phase::Loaded { page_count } => Some(page_count),
            _ => None,
        }
    }

    /// Pages that should hold a current render under the active policy
    #[must_use]
    pub fn pages_in_scope(&self) -> Vec<u32> {
        let Some(page_count) = self.page_count() else {
            return Vec::new();
        };
        match self.policy {
            RenderPolicy::Eager => (1..=page_count).collect(),
            RenderPolicy::Lazy => self
                .visible
                .iter()
                .copied()
                .filter(|page| (1..=page_count).contains(page))
                .collect(),
        }
    }

    /// Apply a command and return resulting effects
    #[must_use]
    pub fn apply(&mut self, cmd: Command) -> Vec<Effect> {
        match cmd {
            Command::Open => {
                self.phase = Phase::Loading;
                vec![Effect::CancelAll, Effect::ClearDocument, Effect::SpawnLoader]
            }

            Command::DocumentLoaded(page_count) => {
                if self.phase != Phase::Loading {
                    return vec![];
                }
                self.phase = Phase::Loaded { page_count };
                let mut effects = vec![Effect::SpawnWorkers];
                effects.extend(self.pages_in_scope().into_iter().map(Effect::EnsurePage));
                effects
            }

            Command::LoadFailed(reason) => {
                if self.phase == Phase::Loading {
                    self.phase = Phase::Failed { reason };
                }
                vec![]
            }

            Command::SetContainerWidth(width) => {
                self.container_width = width;
                let target = target_display_width(width, &self.width_policy);
                if (self.target_width - target).abs() > f32::EPSILON {
                    self.target_width = target;
                    self.pages_in_scope()
                        .into_iter()
                        .map(Effect::RenderPage)
                        .collect()
                } else {
                    vec![]
                }
            }

            Command::SetVisiblePages(pages) => {
                let visible: BTreeSet<u32> = pages.into_iter().filter(|p| *p > 0).collect();
                let lazy = self.policy == RenderPolicy::Lazy;
                let loaded = self.page_count().is_some();

                let mut effects = Vec::new();
                if lazy && loaded {
                    effects.extend(self.visible.difference(&visible).copied().map(Effect::CancelPage));
                }
                self.visible = visible;
                if lazy && loaded {
                    effects.extend(self.pages_in_scope().into_iter().map(Effect::EnsurePage));
                }
                effects
            }

            Command::PageNeedsRerender(page) => {
                if self.pages_in_scope().contains(&page) {
                    vec![Effect::RenderPage(page)]
                } else {
                    vec![]
                }
            }

            Command::Teardown => {
                self.phase = Phase::Idle;
                self.visible.clear();
                vec![Effect::CancelAll, Effect::ClearDocument]
            }
        }
    }
}

/// Commands that modify pipeline state
#[derive(Clone, Debug)]
pub enum Command {
    /// A new document source was set
    Open,
    /// The loader reported the page count
    DocumentLoaded(u32),
    /// The loader could not open the document
    LoadFailed(String),
    /// The host container was measured
    SetContainerWidth(f32),
    /// The host scrolled; these pages are now visible
    SetVisiblePages(Vec<u32>),
    /// Force a fresh render of one page
    PageNeedsRerender(u32),
    /// The viewer is going away
    Teardown,
}

/// Effects produced by state changes
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Cancel every in-flight render
    CancelAll,
    /// Drop workers, channels, metrics, surfaces and cache of the current document
    ClearDocument,
    /// Resolve and open the document source in the background
    SpawnLoader,
    /// Start render workers for the loaded document
    SpawnWorkers,
    /// Render a page, superseding any in-flight render of it
    RenderPage(u32),
    /// Render a page unless it is in flight or already current
    EnsurePage(u32),
    /// Cancel the in-flight render of a page
    CancelPage(u32),
}
