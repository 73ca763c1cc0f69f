#![forbid(unsafe_code)]

//! Source-code slice: the file list, per-file contents, and the focused line.

use dbgscope_core::{
    DataLoadState, LoadState, SourceFileContent, SourceFileSpec, StackFrame, ViewError,
    ViewResult,
};

/// Source files of the active run.
#[derive(Debug, Clone, Default)]
pub struct SourceCodeState {
    list_load: LoadState,
    files: Vec<SourceFileSpec>,
    contents: Vec<SourceFileContent>,
    focus_line: Option<StackFrame>,
}

impl SourceCodeState {
    #[must_use]
    pub fn list_load(&self) -> LoadState {
        self.list_load
    }

    #[must_use]
    pub fn files(&self) -> &[SourceFileSpec] {
        &self.files
    }

    #[must_use]
    pub fn file_index(&self, file: &SourceFileSpec) -> Option<usize> {
        self.files.iter().position(|f| f == file)
    }

    #[must_use]
    pub fn content(&self, file: &SourceFileSpec) -> Option<&SourceFileContent> {
        self.file_index(file).and_then(|i| self.contents.get(i))
    }

    /// The focused source line, as a frame of the current stack trace.
    #[must_use]
    pub fn focus_line(&self) -> Option<&StackFrame> {
        self.focus_line.as_ref()
    }

    #[must_use]
    pub fn focused_file_index(&self) -> Option<usize> {
        let line = self.focus_line.as_ref()?;
        self.files
            .iter()
            .position(|f| line.is_in_file(&f.host_name, &f.file_path))
    }

    #[must_use]
    pub fn focused_file_content(&self) -> Option<&SourceFileContent> {
        self.focused_file_index().and_then(|i| self.contents.get(i))
    }

    pub(crate) fn set_focus_line(&mut self, line: StackFrame) {
        self.focus_line = Some(line);
    }

    pub(crate) fn start_list_loading(&mut self) {
        self.list_load.start_loading();
    }

    pub(crate) fn on_list_failed(&mut self) {
        self.list_load.fail();
    }

    /// Replace the file list, keeping contents of files still listed.
    pub(crate) fn on_list_loaded(&mut self, files: Vec<SourceFileSpec>, now_ms: u64) {
        let contents = files
            .iter()
            .map(|f| self.content(f).cloned().unwrap_or_default())
            .collect();
        self.files = files;
        self.contents = contents;
        self.list_load.finish_loading(now_ms);
    }

    /// Mark `file` as loading. Returns whether a fetch is needed.
    ///
    /// # Errors
    ///
    /// `UnknownSourceFile` when `file` is not in the file list.
    pub(crate) fn request_file(&mut self, file: &SourceFileSpec) -> ViewResult<bool> {
        let content = self.content_mut(file)?;
        match content.load_state {
            DataLoadState::Loading | DataLoadState::Loaded => Ok(false),
            DataLoadState::NotLoaded | DataLoadState::Failed => {
                content.load_state = DataLoadState::Loading;
                Ok(true)
            }
        }
    }

    pub(crate) fn on_file_loaded(
        &mut self,
        file: &SourceFileSpec,
        lines: Vec<String>,
    ) -> ViewResult<()> {
        *self.content_mut(file)? = SourceFileContent {
            load_state: DataLoadState::Loaded,
            lines: Some(lines),
        };
        Ok(())
    }

    pub(crate) fn on_file_failed(&mut self, file: &SourceFileSpec) {
        if let Ok(content) = self.content_mut(file) {
            content.load_state = DataLoadState::Failed;
        }
    }

    fn content_mut(&mut self, file: &SourceFileSpec) -> ViewResult<&mut SourceFileContent> {
        self.file_index(file)
            .and_then(|i| self.contents.get_mut(i))
            .ok_or_else(|| ViewError::UnknownSourceFile(file.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(path: &str) -> SourceFileSpec {
        SourceFileSpec::new("localhost", path)
    }

    #[test]
    fn unknown_file_is_rejected() {
        let mut s = SourceCodeState::default();
        s.on_list_loaded(vec![spec("/a.py")], 1);
        assert_eq!(
            s.request_file(&spec("/b.py")),
            Err(ViewError::UnknownSourceFile(spec("/b.py")))
        );
        assert!(s.on_file_loaded(&spec("/b.py"), vec![]).is_err());
    }

    #[test]
    fn request_then_load() {
        let mut s = SourceCodeState::default();
        s.on_list_loaded(vec![spec("/a.py"), spec("/b.py")], 1);
        assert_eq!(s.request_file(&spec("/b.py")), Ok(true));
        assert_eq!(s.request_file(&spec("/b.py")), Ok(false));
        s.on_file_loaded(&spec("/b.py"), vec!["x = 1".into()]).unwrap();
        assert_eq!(
            s.content(&spec("/b.py")).and_then(|c| c.lines.as_ref()).map(Vec::len),
            Some(1)
        );
    }

    #[test]
    fn relisting_keeps_loaded_contents() {
        let mut s = SourceCodeState::default();
        s.on_list_loaded(vec![spec("/a.py")], 1);
        s.request_file(&spec("/a.py")).unwrap();
        s.on_file_loaded(&spec("/a.py"), vec!["pass".into()]).unwrap();
        s.on_list_loaded(vec![spec("/z.py"), spec("/a.py")], 2);
        assert_eq!(
            s.content(&spec("/a.py")).map(|c| c.load_state),
            Some(DataLoadState::Loaded)
        );
        assert_eq!(
            s.content(&spec("/z.py")).map(|c| c.load_state),
            Some(DataLoadState::NotLoaded)
        );
    }

    #[test]
    fn focused_file_follows_focus_line() {
        let mut s = SourceCodeState::default();
        s.on_list_loaded(vec![spec("/a.py"), spec("/b.py")], 1);
        assert_eq!(s.focused_file_index(), None);
        s.set_focus_line(StackFrame::new("localhost", "/b.py", 3, "f"));
        assert_eq!(s.focused_file_index(), Some(1));
        assert_eq!(
            s.focused_file_content().map(|c| c.load_state),
            Some(DataLoadState::NotLoaded)
        );
    }
}
