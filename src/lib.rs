//! An interactive launcher for the dynamic object retrieval pipeline.
//!
//! The offline pipeline (folder initialisation, convex and supervoxel
//! segmentation, PFHRGB and SIFT feature extraction, vocabulary training and
//! querying) is a set of separately compiled executables. This crate only
//! sequences them: it asks the operator for a data folder, validates it, and
//! runs the chosen stage on it, returning to the menu afterwards.
//!
//! The main entry point is [`Menu`]. Process launching and console I/O sit
//! behind the [`Launcher`] and [`LineReader`] traits so the menus can be
//! driven from scripts and tests as well as from a terminal.

pub mod command;
pub mod env;
mod external;
mod io_adapters;
mod menu;
mod submenu;

pub use command::{
    ExitCode, InvalidSelection, Launcher, Selection, Stage, SubMenu, SubMenuFactory,
};
pub use env::{Environment, Session};
pub use external::{ProcessLauncher, find_stage_executable, install_interrupt_guard};
pub use io_adapters::{Console, EditorReader, LineReader, MemWriter, ScriptedReader};
pub use menu::{Factory, Flow, Menu};
pub use submenu::{QueryingMenu, TrainingMenu};
