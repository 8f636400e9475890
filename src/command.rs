use crate::env::Environment;
use crate::io_adapters::Console;
use anyhow::Result;
use std::error::Error;
use std::ffi::OsString;
use std::fmt;
use std::str::FromStr;

/// Conventional process exit code reported by a launched stage.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Processes killed by a signal report `128 + signal` on Unix.
pub type ExitCode = i32;

/// One external executable of the offline retrieval pipeline.
///
/// Every stage is invoked with the session data path as its only argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    InitFolders,
    ConvexSegmentation,
    SupervoxelSegmentation,
    ConvexFeatures,
    Subsegments,
    SupervoxelFeatures,
    Sift,
}

impl Stage {
    /// All stages in menu order.
    pub const ALL: [Stage; 7] = [
        Stage::InitFolders,
        Stage::ConvexSegmentation,
        Stage::SupervoxelSegmentation,
        Stage::ConvexFeatures,
        Stage::Subsegments,
        Stage::SupervoxelFeatures,
        Stage::Sift,
    ];

    /// Menu token that selects this stage.
    pub fn token(self) -> &'static str {
        match self {
            Stage::InitFolders => "2",
            Stage::ConvexSegmentation => "3a",
            Stage::SupervoxelSegmentation => "3b",
            Stage::ConvexFeatures => "4",
            Stage::Subsegments => "5a",
            Stage::SupervoxelFeatures => "5b",
            Stage::Sift => "6",
        }
    }

    /// File name of the executable implementing this stage.
    pub fn executable(self) -> &'static str {
        match self {
            Stage::InitFolders => "dynamic_init_folders",
            Stage::ConvexSegmentation => "dynamic_convex_segmentation",
            Stage::SupervoxelSegmentation => "dynamic_supervoxel_convex_segmentation",
            Stage::ConvexFeatures => "dynamic_extract_convex_features",
            Stage::Subsegments => "dynamic_create_subsegments",
            Stage::SupervoxelFeatures => "dynamic_extract_supervoxel_features",
            Stage::Sift => "dynamic_extract_sift",
        }
    }
}

/// A parsed main menu choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selection {
    SetDataPath,
    Launch(Stage),
    Training,
    Querying,
    Exit,
}

impl FromStr for Selection {
    type Err = InvalidSelection;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "1" => Ok(Selection::SetDataPath),
            "7" => Ok(Selection::Training),
            "8" => Ok(Selection::Querying),
            "9" => Ok(Selection::Exit),
            _ => Stage::ALL
                .into_iter()
                .find(|stage| stage.token() == token)
                .map(Selection::Launch)
                .ok_or_else(|| InvalidSelection(token.to_string())),
        }
    }
}

/// Returned when a menu token does not name any option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidSelection(pub String);

impl fmt::Display for InvalidSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Option {} is not valid.", self.0)
    }
}

impl Error for InvalidSelection {}

/// Starts external programs on behalf of a menu.
///
/// The production implementation spawns real processes; tests substitute a
/// recorder so that launches can be asserted without any executables around.
pub trait Launcher {
    /// Run `program` with `args` and block until it terminates.
    ///
    /// Returns the program's exit code, or an error if it could not be started.
    fn launch(&mut self, program: &str, args: &[OsString]) -> Result<ExitCode>;
}

/// An interactive menu that the main menu delegates to.
///
/// `run` blocks until the operator picks the sub-menu's own exit option.
pub trait SubMenu {
    fn run(
        self: Box<Self>,
        console: &mut Console,
        launcher: &mut dyn Launcher,
        env: &Environment,
    ) -> Result<()>;
}

/// Creates a fresh sub-menu each time the operator enters it.
pub trait SubMenuFactory {
    fn create(&self) -> Box<dyn SubMenu>;
}
