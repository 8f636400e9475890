//! The vocabulary training and querying menus reachable from the main menu.

use crate::command::{InvalidSelection, Launcher, SubMenu};
use crate::env::{Environment, acquire_directory};
use crate::io_adapters::Console;
use crate::menu::launch_and_report;
use anyhow::Result;
use std::path::PathBuf;
use std::str::FromStr;

const VOCABULARY_PROMPT: &str = " Please supply the vocabulary path: ";

const TRAIN_EXECUTABLE: &str = "dynamic_train_vocabulary";
// Deployment-specific: rename to match the installed querying binaries.
const QUERY_EXECUTABLE: &str = "dynamic_query_vocabulary";
const BENCHMARK_EXECUTABLE: &str = "dynamic_benchmark";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrainingOption {
    SetVocabularyPath,
    Train,
    Back,
}

impl FromStr for TrainingOption {
    type Err = InvalidSelection;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "1" => Ok(TrainingOption::SetVocabularyPath),
            "2" => Ok(TrainingOption::Train),
            "3" => Ok(TrainingOption::Back),
            other => Err(InvalidSelection(other.to_string())),
        }
    }
}

/// Trains a vocabulary folder prepared from the segmented data.
///
/// The folder must hold the `vocabulary_summary.json` the training
/// executable reads its noise/annotated data paths from.
#[derive(Debug, Default)]
pub struct TrainingMenu {
    vocabulary_path: PathBuf,
}

impl TrainingMenu {
    fn render(&self, console: &mut Console) -> Result<()> {
        console.say(format_args!(
            " \n \
             Working on vocabulary path {}\n \
             \n \
             1.  Set vocabulary path (if you want to change)\n \
             2.  Train vocabulary\n \
             3.  Back to main menu\n",
            self.vocabulary_path.display()
        ))
    }
}

impl SubMenu for TrainingMenu {
    fn run(
        mut self: Box<Self>,
        console: &mut Console,
        launcher: &mut dyn Launcher,
        env: &Environment,
    ) -> Result<()> {
        let Some(path) = acquire_directory(console, env, VOCABULARY_PROMPT, None)? else {
            return Ok(());
        };
        self.vocabulary_path = path;
        loop {
            self.render(console)?;
            let Some(line) = console.prompt(" Please enter an option 1-3: ")? else {
                return Ok(());
            };
            match line.parse::<TrainingOption>() {
                Ok(TrainingOption::SetVocabularyPath) => {
                    if !reacquire(console, env, &mut self.vocabulary_path)? {
                        return Ok(());
                    }
                }
                Ok(TrainingOption::Train) => {
                    launch_and_report(console, launcher, TRAIN_EXECUTABLE, &self.vocabulary_path)?;
                }
                Ok(TrainingOption::Back) => return Ok(()),
                Err(invalid) => console.say(format_args!(" {invalid}"))?,
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryingOption {
    SetVocabularyPath,
    Query,
    Benchmark,
    Back,
}

impl FromStr for QueryingOption {
    type Err = InvalidSelection;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "1" => Ok(QueryingOption::SetVocabularyPath),
            "2" => Ok(QueryingOption::Query),
            "3" => Ok(QueryingOption::Benchmark),
            "4" => Ok(QueryingOption::Back),
            other => Err(InvalidSelection(other.to_string())),
        }
    }
}

/// Queries a trained vocabulary and benchmarks retrieval against it.
///
/// The querying and benchmarking executable names (`QUERY_EXECUTABLE`,
/// `BENCHMARK_EXECUTABLE`) are deployment-specific. Swap this menu out
/// through [`crate::Menu::with_sub_menus`] if your build names them differently.
#[derive(Debug, Default)]
pub struct QueryingMenu {
    vocabulary_path: PathBuf,
}

impl QueryingMenu {
    fn render(&self, console: &mut Console) -> Result<()> {
        console.say(format_args!(
            " \n \
             Working on vocabulary path {}\n \
             \n \
             1.  Set vocabulary path (if you want to change)\n \
             2.  Query the vocabulary\n \
             3.  Benchmark retrieval\n \
             4.  Back to main menu\n",
            self.vocabulary_path.display()
        ))
    }
}

impl SubMenu for QueryingMenu {
    fn run(
        mut self: Box<Self>,
        console: &mut Console,
        launcher: &mut dyn Launcher,
        env: &Environment,
    ) -> Result<()> {
        let Some(path) = acquire_directory(console, env, VOCABULARY_PROMPT, None)? else {
            return Ok(());
        };
        self.vocabulary_path = path;
        loop {
            self.render(console)?;
            let Some(line) = console.prompt(" Please enter an option 1-4: ")? else {
                return Ok(());
            };
            match line.parse::<QueryingOption>() {
                Ok(QueryingOption::SetVocabularyPath) => {
                    if !reacquire(console, env, &mut self.vocabulary_path)? {
                        return Ok(());
                    }
                }
                Ok(QueryingOption::Query) => {
                    launch_and_report(console, launcher, QUERY_EXECUTABLE, &self.vocabulary_path)?;
                }
                Ok(QueryingOption::Benchmark) => {
                    let target = &self.vocabulary_path;
                    launch_and_report(console, launcher, BENCHMARK_EXECUTABLE, target)?;
                }
                Ok(QueryingOption::Back) => return Ok(()),
                Err(invalid) => console.say(format_args!(" {invalid}"))?,
            }
        }
    }
}

// false when input ended before a new folder was given
fn reacquire(console: &mut Console, env: &Environment, path: &mut PathBuf) -> Result<bool> {
    match acquire_directory(console, env, VOCABULARY_PROMPT, None)? {
        Some(new_path) => {
            tracing::info!(vocabulary_path = %new_path.display(), "vocabulary path changed");
            *path = new_path;
            Ok(true)
        }
        None => Ok(false),
    }
}
