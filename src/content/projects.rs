use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::AppError;

/// Number of cards on the landing page.
pub const FEATURED_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Proposed,
    InProgress,
    Finished,
}

impl FromStr for ProjectStatus {
    type Err = AppError;

    /// Accepts any casing and spaces or dashes for underscores: "in progress",
    /// "In-Progress" and "IN_PROGRESS" all parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .trim()
            .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("_")
            .to_uppercase();

        match normalized.as_str() {
            "PROPOSED" => Ok(Self::Proposed),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "FINISHED" => Ok(Self::Finished),
            _ => Err(AppError::BadRequest(format!("Unknown project status: {}", s))),
        }
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectStatus::Proposed => write!(f, "Proposed"),
            ProjectStatus::InProgress => write!(f, "In progress"),
            ProjectStatus::Finished => write!(f, "Finished"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ProjectTag {
    Embedded,
    #[serde(rename = "PCB")]
    Pcb,
    Hardware,
    Web,
    Backend,
    #[serde(rename = "ML")]
    Ml,
    Systems,
    Business,
    Research,
}

impl FromStr for ProjectTag {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "embedded" => Ok(Self::Embedded),
            "pcb" => Ok(Self::Pcb),
            "hardware" => Ok(Self::Hardware),
            "web" => Ok(Self::Web),
            "backend" => Ok(Self::Backend),
            "ml" => Ok(Self::Ml),
            "systems" => Ok(Self::Systems),
            "business" => Ok(Self::Business),
            "research" => Ok(Self::Research),
            _ => Err(AppError::BadRequest(format!("Unknown project tag: {}", s))),
        }
    }
}

impl fmt::Display for ProjectTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProjectTag::Embedded => "Embedded",
            ProjectTag::Pcb => "PCB",
            ProjectTag::Hardware => "Hardware",
            ProjectTag::Web => "Web",
            ProjectTag::Backend => "Backend",
            ProjectTag::Ml => "ML",
            ProjectTag::Systems => "Systems",
            ProjectTag::Business => "Business",
            ProjectTag::Research => "Research",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub slug: &'static str,
    pub title: &'static str,
    pub status: ProjectStatus,
    pub summary: &'static str,
    pub tags: &'static [ProjectTag],
    pub stack_tags: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github_url: Option<&'static str>,
}

use self::ProjectStatus::{InProgress, Proposed};
use self::ProjectTag::*;

static PROJECTS: &[Project] = &[
    Project {
        slug: "homemade-sim-build",
        title: "Homemade Sim Build",
        status: InProgress,
        summary: "DIY sim racing setup: F1-style wheel, pedals, electronics, and integration.",
        tags: &[Hardware, Embedded, Pcb],
        stack_tags: &["KiCad", "STM32", "Fusion 360"],
        github_url: None,
    },
    Project {
        slug: "flight-controller-drone",
        title: "Flight Controller Drone",
        status: Proposed,
        summary: "Custom flight controller + drone with sensor fusion, lidar, autonomy, and follow/sentry modes.",
        tags: &[Embedded, Hardware, Systems],
        stack_tags: &["Sensor Fusion", "Lidar", "Control Loops"],
        github_url: None,
    },
    Project {
        slug: "cellbox",
        title: "CellBOX",
        status: Proposed,
        summary: "Portable micro cell tower concept with Starlink/satellite backhaul for remote coverage.",
        tags: &[Hardware, Systems],
        stack_tags: &["Cellular", "Backhaul", "Networking"],
        github_url: None,
    },
    Project {
        slug: "project-astro",
        title: "Project ASTRO",
        status: InProgress,
        summary: "Local-first OS-level assistant using offline Llama models with Hume AI voice and installable packaging.",
        tags: &[Ml, Systems],
        stack_tags: &["Llama", "Hume AI", "Automation"],
        github_url: None,
    },
    Project {
        slug: "capacitive-keyboard-desk",
        title: "Capacitive Keyboard Desk",
        status: Proposed,
        summary: "Evolves from a custom keyboard + touch bar into a full capacitive glass-desk interface with gesture control.",
        tags: &[Hardware, Embedded],
        stack_tags: &["Fusion 360", "Capacitive Sensing", "Firmware"],
        github_url: None,
    },
    Project {
        slug: "iot-dev-board",
        title: "IoT Dev Board",
        status: Proposed,
        summary: "Prototype board supporting both bare-metal firmware work and Linux/SBC-class development.",
        tags: &[Embedded, Hardware],
        stack_tags: &["Linux", "SBC", "Prototyping"],
        github_url: None,
    },
    Project {
        slug: "carbon-fiber-scale-planes",
        title: "Carbon Fiber Scale Planes",
        status: Proposed,
        summary: "Decorative scale aircraft builds in carbon fiber to stay sharp in Fusion 360 and fabrication.",
        tags: &[Hardware],
        stack_tags: &["Fusion 360", "Carbon Fiber"],
        github_url: None,
    },
    Project {
        slug: "ogwashi-uku-website",
        title: "Ogwashi-Uku Website",
        status: InProgress,
        summary: "Modern public site + member portal with auth/RBAC, chapters, events, and admin workflows.",
        tags: &[Web, Backend, Systems],
        stack_tags: &["Next.js", "Postgres", "RBAC"],
        github_url: None,
    },
    Project {
        slug: "hud-helmet",
        title: "HUD Helmet",
        status: InProgress,
        summary: "Motorsport-inspired HUD helmet with IMU tracking, Bluetooth hands-free controls, and sensor fusion.",
        tags: &[Hardware, Embedded, Systems],
        stack_tags: &["IMU", "Bluetooth", "Sensor Fusion"],
        github_url: None,
    },
];

/// The catalogue in display order.
pub fn all() -> &'static [Project] {
    PROJECTS
}

pub fn by_slug(slug: &str) -> Option<&'static Project> {
    PROJECTS.iter().find(|p| p.slug == slug)
}

pub fn filter(
    projects: &[Project],
    status: Option<ProjectStatus>,
    tag: Option<ProjectTag>,
) -> Vec<&Project> {
    projects
        .iter()
        .filter(|p| status.is_none_or(|s| p.status == s))
        .filter(|p| tag.is_none_or(|t| p.tags.contains(&t)))
        .collect()
}

/// Landing-page selection: one in-progress, one proposed and one finished
/// project, a second in-progress one when nothing is finished, then whatever
/// comes first. Picks keep catalogue order and never repeat a title.
pub fn featured(projects: &[Project]) -> Vec<&Project> {
    let mut picked: Vec<&Project> = Vec::with_capacity(FEATURED_COUNT);

    for status in [ProjectStatus::InProgress, ProjectStatus::Proposed] {
        if let Some(project) = first_unused(projects, Some(status), &picked) {
            picked.push(project);
        }
    }

    let closing = first_unused(projects, Some(ProjectStatus::Finished), &picked)
        .or_else(|| first_unused(projects, Some(ProjectStatus::InProgress), &picked));
    if let Some(project) = closing {
        picked.push(project);
    }

    while picked.len() < FEATURED_COUNT {
        match first_unused(projects, None, &picked) {
            Some(project) => picked.push(project),
            None => break,
        }
    }

    picked
}

fn first_unused<'a>(
    projects: &'a [Project],
    status: Option<ProjectStatus>,
    picked: &[&Project],
) -> Option<&'a Project> {
    projects.iter().find(|p| {
        !p.title.is_empty()
            && !picked.iter().any(|q| q.title == p.title)
            && status.is_none_or(|s| p.status == s)
    })
}

#[cfg(test)]
impl Project {
    pub fn mock(title: &'static str, status: ProjectStatus) -> Self {
        Self {
            slug: title,
            title,
            status,
            summary: "Mock project",
            tags: &[],
            stack_tags: &[],
            github_url: None,
        }
    }
}
