use crate::command::{ExitCode, Launcher, Selection, SubMenu, SubMenuFactory};
use crate::env::{Environment, Session, acquire_directory, with_trailing_separator};
use crate::io_adapters::Console;
use crate::submenu::{QueryingMenu, TrainingMenu};
use anyhow::{Result, anyhow};
use std::path::Path;

const DATA_PATH_PROMPT: &str = " Please supply the data path: ";
const OPTION_PROMPT: &str = " Please enter an option 1-9(a/b): ";

/// Factory creating default-constructed sub-menus.
pub struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

impl<T: SubMenu + Default + 'static> SubMenuFactory for Factory<T> {
    fn create(&self) -> Box<dyn SubMenu> {
        Box::new(T::default())
    }
}

/// Whether the main loop keeps going after a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// The main pipeline menu.
///
/// Holds the session data path and dispatches operator selections to stage
/// launches or sub-menus. Construction blocks until a valid data folder has
/// been supplied, so a `Menu` always has one.
///
/// Example
/// ```no_run
/// use retrieval_menu::{Console, Environment, Menu, ProcessLauncher};
/// let env = Environment::new().unwrap();
/// let launcher = ProcessLauncher::new(&env);
/// let console = Console::interactive().unwrap();
/// let mut menu = Menu::new(env, console, Box::new(launcher), None).unwrap();
/// menu.run().unwrap();
/// ```
pub struct Menu {
    env: Environment,
    session: Session,
    console: Console,
    launcher: Box<dyn Launcher>,
    training: Box<dyn SubMenuFactory>,
    querying: Box<dyn SubMenuFactory>,
}

impl Menu {
    /// Acquire the data path (trying `preset` first) and build the menu with
    /// the default training and querying sub-menus.
    pub fn new(
        env: Environment,
        mut console: Console,
        launcher: Box<dyn Launcher>,
        preset: Option<&str>,
    ) -> Result<Self> {
        let data_path = acquire_directory(&mut console, &env, DATA_PATH_PROMPT, preset)?
            .ok_or_else(|| anyhow!("input closed before a data path was supplied"))?;
        tracing::info!(data_path = %data_path.display(), "session started");
        Ok(Self {
            env,
            session: Session::new(data_path),
            console,
            launcher,
            training: Box::new(Factory::<TrainingMenu>::default()),
            querying: Box::new(Factory::<QueryingMenu>::default()),
        })
    }

    /// Replace the collaborators behind options 7 and 8.
    pub fn with_sub_menus(
        mut self,
        training: Box<dyn SubMenuFactory>,
        querying: Box<dyn SubMenuFactory>,
    ) -> Self {
        self.training = training;
        self.querying = querying;
        self
    }

    pub fn data_path(&self) -> &Path {
        self.session.data_path()
    }

    /// Show the menu and handle selections until the operator exits.
    pub fn run(&mut self) -> Result<()> {
        loop {
            self.render()?;
            let Some(line) = self.console.prompt(OPTION_PROMPT)? else {
                tracing::debug!("no more input, leaving menu");
                return Ok(());
            };
            let flow = match line.parse::<Selection>() {
                Ok(selection) => self.dispatch(selection)?,
                Err(invalid) => {
                    self.console.say(format_args!(" {invalid}"))?;
                    Flow::Continue
                }
            };
            if flow == Flow::Exit {
                return Ok(());
            }
        }
    }

    /// Carry out one selection.
    pub fn dispatch(&mut self, selection: Selection) -> Result<Flow> {
        tracing::debug!(?selection, "dispatching");
        match selection {
            Selection::SetDataPath => {
                match acquire_directory(&mut self.console, &self.env, DATA_PATH_PROMPT, None)? {
                    Some(path) => {
                        tracing::info!(data_path = %path.display(), "data path changed");
                        self.session.set_data_path(path);
                    }
                    None => return Ok(Flow::Exit),
                }
            }
            Selection::Launch(stage) => {
                launch_and_report(
                    &mut self.console,
                    self.launcher.as_mut(),
                    stage.executable(),
                    self.session.data_path(),
                )?;
            }
            Selection::Training => {
                self.console.say(" Entering the vocabulary training menu...")?;
                let menu = self.training.create();
                self.enter(menu)?;
            }
            Selection::Querying => {
                self.console.say(" Entering the querying & benchmarking menu...")?;
                let menu = self.querying.create();
                self.enter(menu)?;
            }
            Selection::Exit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }

    fn enter(&mut self, menu: Box<dyn SubMenu>) -> Result<()> {
        tracing::info!("entering sub-menu");
        if let Err(err) = menu.run(&mut self.console, self.launcher.as_mut(), &self.env) {
            tracing::warn!(error = %err, "sub-menu failed");
            self.console.say(format_args!(" {err:#}"))?;
        }
        Ok(())
    }

    fn render(&mut self) -> Result<()> {
        let text = render_menu(self.session.data_path());
        self.console.say(text)
    }
}

fn render_menu(data_path: &Path) -> String {
    format!(
        " \n \
         Please make sure to do the following in order both for the noise data folder and for the annotated data\n \
         \n \
         Working on data path {}\n \
         \n \
         1.  Set data path (if you want to change)\n \
         2.  Init sweep segment folders\n \
         3a. Create convex segments (alternative to 3b & 5b)\n \
         3b. Create convex segments and supervoxels (alternative to 3a & 5a)\n \
         4.  Extract PFHRGB features\n \
         5a. Segment keypoints into subsegments (alternative to 5b)\n \
         5b. Create PFHRGB feature for supervoxels (alternative to 5a)\n \
         6.  Extract SIFT from sweeps (for re-weighting)\n \
         7.  Vocabulary training menu\n \
         8.  Querying & benchmarking menu\n \
         9.  Exit\n",
        data_path.display()
    )
}

/// Run one executable on `target` and tell the operator how it went.
///
/// A failed or missing executable is reported, never propagated; only
/// console errors are returned.
pub(crate) fn launch_and_report(
    console: &mut Console,
    launcher: &mut dyn Launcher,
    executable: &str,
    target: &Path,
) -> Result<Option<ExitCode>> {
    console.say(format_args!(" Running {executable}...\n"))?;
    console.flush()?;
    tracing::info!(executable, target = %target.display(), "launching stage");
    match launcher.launch(executable, &[with_trailing_separator(target)]) {
        Ok(0) => Ok(Some(0)),
        Ok(code) => {
            tracing::warn!(executable, code, "stage exited with failure");
            console.say(format_args!(" {executable} exited with status {code}."))?;
            Ok(Some(code))
        }
        Err(err) => {
            tracing::warn!(executable, error = %err, "stage could not be run");
            console.say(format_args!(" Could not run {executable}: {err:#}"))?;
            Ok(None)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::command::Stage;
    use crate::io_adapters::{MemWriter, ScriptedReader};
    use std::cell::RefCell;
    use std::ffi::OsString;
    use std::fs;
    use std::path::PathBuf;
    use std::rc::Rc;
    use std::time::{SystemTime, UNIX_EPOCH};

    pub(crate) type Calls = Rc<RefCell<Vec<(String, Vec<OsString>)>>>;

    /// Launcher double that records every call and returns a fixed code.
    pub(crate) struct RecordingLauncher {
        calls: Calls,
        code: ExitCode,
    }

    impl RecordingLauncher {
        pub(crate) fn with_handle(code: ExitCode) -> (Self, Calls) {
            let calls = Calls::default();
            (
                Self {
                    calls: calls.clone(),
                    code,
                },
                calls,
            )
        }
    }

    impl Launcher for RecordingLauncher {
        fn launch(&mut self, program: &str, args: &[OsString]) -> Result<ExitCode> {
            self.calls
                .borrow_mut()
                .push((program.to_string(), args.to_vec()));
            Ok(self.code)
        }
    }

    struct FailingLauncher;

    impl Launcher for FailingLauncher {
        fn launch(&mut self, program: &str, _args: &[OsString]) -> Result<ExitCode> {
            Err(anyhow!("{program} not found in /opt/bin"))
        }
    }

    struct CountingSubMenu(Rc<RefCell<u32>>);

    impl SubMenu for CountingSubMenu {
        fn run(
            self: Box<Self>,
            _console: &mut Console,
            _launcher: &mut dyn Launcher,
            _env: &Environment,
        ) -> Result<()> {
            *self.0.borrow_mut() += 1;
            Ok(())
        }
    }

    struct CountingFactory(Rc<RefCell<u32>>);

    impl SubMenuFactory for CountingFactory {
        fn create(&self) -> Box<dyn SubMenu> {
            Box::new(CountingSubMenu(self.0.clone()))
        }
    }

    pub(crate) fn make_unique_temp_dir(tag: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let p = std::env::temp_dir().join(format!(
            "menu_tests_{}_{}_{}",
            tag,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&p).expect("create temp dir");
        fs::canonicalize(p).expect("canonicalize temp dir")
    }

    fn env_in(dir: &Path) -> Environment {
        Environment {
            current_dir: dir.to_path_buf(),
            bin_dir: PathBuf::from("."),
        }
    }

    fn scripted<const N: usize>(lines: [&str; N]) -> (Console, Rc<RefCell<Vec<u8>>>) {
        let (out, buf) = MemWriter::with_handle();
        let console = Console::new(Box::new(ScriptedReader::new(lines)), Box::new(out));
        (console, buf)
    }

    fn text_of(buf: &Rc<RefCell<Vec<u8>>>) -> String {
        String::from_utf8(buf.borrow().clone()).unwrap()
    }

    #[test]
    fn test_every_stage_launches_its_executable_with_trailing_separator() {
        let tmp = make_unique_temp_dir("stages");
        let tokens: Vec<&str> = Stage::ALL.iter().map(|s| s.token()).chain(["9"]).collect();
        let (launcher, calls) = RecordingLauncher::with_handle(0);
        let reader = ScriptedReader::new(tokens);
        let console = Console::new(Box::new(reader), Box::new(MemWriter::new()));

        let mut menu = Menu::new(env_in(&tmp), console, Box::new(launcher), Some(".")).unwrap();
        menu.run().unwrap();

        let expected_arg = with_trailing_separator(&tmp);
        let calls = calls.borrow();
        assert_eq!(calls.len(), Stage::ALL.len());
        for (stage, (program, args)) in Stage::ALL.iter().zip(calls.iter()) {
            assert_eq!(program, stage.executable());
            assert_eq!(args, &vec![expected_arg.clone()]);
        }

        let _ = fs::remove_dir_all(tmp);
    }

    #[test]
    fn test_invalid_option_prints_message_and_has_no_side_effects() {
        let tmp = make_unique_temp_dir("invalid");
        let (launcher, calls) = RecordingLauncher::with_handle(0);
        let (reader, prompts) = ScriptedReader::with_handle(["42", "9"]);
        let (out, buf) = MemWriter::with_handle();
        let console = Console::new(Box::new(reader), Box::new(out));

        let mut menu = Menu::new(env_in(&tmp), console, Box::new(launcher), Some(".")).unwrap();
        menu.run().unwrap();

        let text = text_of(&buf);
        assert_eq!(text.matches(" Option 42 is not valid.\n").count(), 1);
        assert_eq!(text.matches("Working on data path").count(), 2);
        assert!(calls.borrow().is_empty());
        assert_eq!(prompts.borrow().len(), 2);
        assert_eq!(menu.data_path(), tmp.as_path());

        let _ = fs::remove_dir_all(tmp);
    }

    #[test]
    fn test_padded_tokens_are_invalid_and_echoed_as_typed() {
        let tmp = make_unique_temp_dir("padded");
        let (launcher, calls) = RecordingLauncher::with_handle(0);
        let (console, buf) = scripted(["2 ", " 42", " 9", "9"]);

        let mut menu = Menu::new(env_in(&tmp), console, Box::new(launcher), Some(".")).unwrap();
        menu.run().unwrap();

        assert!(calls.borrow().is_empty());
        let text = text_of(&buf);
        assert!(text.contains(" Option 2  is not valid.\n"));
        assert!(text.contains(" Option  42 is not valid.\n"));
        assert!(text.contains(" Option  9 is not valid.\n"));
        assert_eq!(text.matches("Working on data path").count(), 4);

        let _ = fs::remove_dir_all(tmp);
    }

    #[test]
    fn test_only_nine_exits() {
        let tmp = make_unique_temp_dir("exit");
        let (launcher, _calls) = RecordingLauncher::with_handle(0);
        let (console, _buf) = scripted([]);
        let mut menu = Menu::new(env_in(&tmp), console, Box::new(launcher), Some("."))
            .unwrap()
            .with_sub_menus(
                Box::new(CountingFactory(Rc::new(RefCell::new(0)))),
                Box::new(CountingFactory(Rc::new(RefCell::new(0)))),
            );

        for token in ["2", "3a", "3b", "4", "5a", "5b", "6", "7", "8"] {
            let selection = token.parse::<Selection>().unwrap();
            assert_eq!(menu.dispatch(selection).unwrap(), Flow::Continue, "token {token}");
        }
        assert_eq!(menu.dispatch(Selection::Exit).unwrap(), Flow::Exit);

        let _ = fs::remove_dir_all(tmp);
    }

    #[test]
    fn test_option_one_changes_data_path() {
        let tmp = make_unique_temp_dir("change");
        fs::create_dir_all(tmp.join("run2")).unwrap();
        let (launcher, calls) = RecordingLauncher::with_handle(0);
        let (console, buf) = scripted(["1", "missing", "run2", "2", "9"]);

        let mut menu = Menu::new(env_in(&tmp), console, Box::new(launcher), Some(".")).unwrap();
        menu.run().unwrap();

        let run2 = tmp.join("run2");
        assert_eq!(menu.data_path(), run2.as_path());
        assert_eq!(calls.borrow()[0].1, vec![with_trailing_separator(&run2)]);
        let text = text_of(&buf);
        let rejected = format!(" {} is not a valid folder!\n", tmp.join("missing").display());
        assert!(text.contains(&rejected));
        assert!(text.contains(&format!("Working on data path {}\n", run2.display())));

        let _ = fs::remove_dir_all(tmp);
    }

    #[test]
    fn test_input_ending_during_option_one_keeps_data_path() {
        let tmp = make_unique_temp_dir("change_eof");
        let (launcher, calls) = RecordingLauncher::with_handle(0);
        let (reader, prompts) = ScriptedReader::with_handle(["1"]);
        let console = Console::new(Box::new(reader), Box::new(MemWriter::new()));

        let mut menu = Menu::new(env_in(&tmp), console, Box::new(launcher), Some(".")).unwrap();
        assert!(menu.run().is_ok());

        assert_eq!(menu.data_path(), tmp.as_path());
        assert!(calls.borrow().is_empty());
        assert_eq!(
            *prompts.borrow(),
            vec![OPTION_PROMPT, DATA_PATH_PROMPT],
            "menu must stop after the path prompt sees end of input"
        );

        let _ = fs::remove_dir_all(tmp);
    }

    #[test]
    fn test_nonzero_exit_is_reported_and_loop_continues() {
        let tmp = make_unique_temp_dir("failure");
        let (launcher, calls) = RecordingLauncher::with_handle(2);
        let (console, buf) = scripted(["6", "6", "9"]);

        let mut menu = Menu::new(env_in(&tmp), console, Box::new(launcher), Some(".")).unwrap();
        menu.run().unwrap();

        assert_eq!(calls.borrow().len(), 2);
        let text = text_of(&buf);
        assert_eq!(text.matches(" Running dynamic_extract_sift...\n\n").count(), 2);
        assert_eq!(
            text.matches(" dynamic_extract_sift exited with status 2.\n").count(),
            2
        );

        let _ = fs::remove_dir_all(tmp);
    }

    #[test]
    fn test_launch_error_is_reported_not_propagated() {
        let tmp = make_unique_temp_dir("spawn");
        let (console, buf) = scripted(["2", "9"]);

        let mut menu =
            Menu::new(env_in(&tmp), console, Box::new(FailingLauncher), Some(".")).unwrap();
        menu.run().unwrap();

        let text = text_of(&buf);
        assert!(text.contains(
            " Could not run dynamic_init_folders: dynamic_init_folders not found in /opt/bin\n"
        ));

        let _ = fs::remove_dir_all(tmp);
    }

    #[test]
    fn test_sub_menus_are_created_per_entry() {
        let tmp = make_unique_temp_dir("submenus");
        let trainings = Rc::new(RefCell::new(0));
        let queries = Rc::new(RefCell::new(0));
        let (launcher, _calls) = RecordingLauncher::with_handle(0);
        let (console, buf) = scripted(["7", "8", "7", "9"]);

        let mut menu = Menu::new(env_in(&tmp), console, Box::new(launcher), Some("."))
            .unwrap()
            .with_sub_menus(
                Box::new(CountingFactory(trainings.clone())),
                Box::new(CountingFactory(queries.clone())),
            );
        menu.run().unwrap();

        assert_eq!(*trainings.borrow(), 2);
        assert_eq!(*queries.borrow(), 1);
        let text = text_of(&buf);
        assert_eq!(
            text.matches(" Entering the vocabulary training menu...\n").count(),
            2
        );
        assert_eq!(
            text.matches(" Entering the querying & benchmarking menu...\n").count(),
            1
        );

        let _ = fs::remove_dir_all(tmp);
    }

    #[test]
    fn test_end_of_input_leaves_the_loop() {
        let tmp = make_unique_temp_dir("eof");
        let (launcher, calls) = RecordingLauncher::with_handle(0);
        let (console, _buf) = scripted(["2"]);

        let mut menu = Menu::new(env_in(&tmp), console, Box::new(launcher), Some(".")).unwrap();
        menu.run().unwrap();

        assert_eq!(calls.borrow().len(), 1);

        let _ = fs::remove_dir_all(tmp);
    }

    #[test]
    fn test_construction_fails_when_input_closes_without_a_path() {
        let tmp = make_unique_temp_dir("nopath");
        let (launcher, _calls) = RecordingLauncher::with_handle(0);
        let (console, _buf) = scripted(["missing"]);

        let res = Menu::new(env_in(&tmp), console, Box::new(launcher), None);
        assert!(res.is_err());

        let _ = fs::remove_dir_all(tmp);
    }

    #[test]
    fn test_menu_text_lists_every_option() {
        let text = render_menu(Path::new("/data/run1"));
        assert!(text.starts_with(" \n Please make sure"));
        assert!(text.contains("\n Working on data path /data/run1\n"));
        let expected = [
            " 1.  Set data path",
            " 3b. Create convex segments and supervoxels",
            " 9.  Exit\n",
        ];
        for line in expected {
            assert!(text.contains(line), "missing {line:?}");
        }
    }
}
