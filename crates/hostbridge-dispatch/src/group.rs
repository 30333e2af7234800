//! Logical upload groups and their cover/standard partition.

/// One logical group of files bound for the same gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupAssignment {
    title: String,
    files: Vec<String>,
    pending: Option<Vec<String>>,
    cover_count: Option<usize>,
}

impl GroupAssignment {
    /// Creates a group whose files are all pending.
    #[must_use]
    pub fn new<I, S>(title: impl Into<String>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: title.into(),
            files: files.into_iter().map(Into::into).collect(),
            pending: None,
            cover_count: None,
        }
    }

    /// Restricts dispatch to a subset of the group's files, for example the
    /// ones that failed in an earlier batch.
    #[must_use]
    pub fn with_pending<I, S>(mut self, pending: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending = Some(pending.into_iter().map(Into::into).collect());
        self
    }

    /// Overrides the configured cover count for this group.
    #[must_use]
    pub const fn with_cover_count(mut self, cover_count: usize) -> Self {
        self.cover_count = Some(cover_count);
        self
    }

    /// Returns the group title.
    #[must_use]
    pub const fn title(&self) -> &str {
        self.title.as_str()
    }

    /// Returns the group's full ordered file list.
    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Returns the files to dispatch in this batch.
    #[must_use]
    pub fn pending_files(&self) -> &[String] {
        self.pending.as_deref().unwrap_or(&self.files)
    }

    /// Returns the group-level cover count override, if any.
    #[must_use]
    pub const fn cover_count(&self) -> Option<usize> {
        self.cover_count
    }

    /// Partitions the pending files by their index in the full list.
    ///
    /// Files whose index is below `cover_count` become covers; everything
    /// else, including pending files absent from the full list, is standard.
    #[must_use]
    pub fn split(&self, cover_count: usize) -> Split {
        let (covers, standards): (Vec<String>, Vec<String>) =
            self.pending_files().iter().cloned().partition(|file| {
                self.files
                    .iter()
                    .position(|candidate| candidate == file)
                    .is_some_and(|index| index < cover_count)
            });
        Split { covers, standards }
    }
}

/// The cover and standard halves of a group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Split {
    covers: Vec<String>,
    standards: Vec<String>,
}

impl Split {
    /// Files routed to the cover sub-job.
    #[must_use]
    pub fn covers(&self) -> &[String] {
        &self.covers
    }

    /// Files routed to the standard sub-job.
    #[must_use]
    pub fn standards(&self) -> &[String] {
        &self.standards
    }
}
