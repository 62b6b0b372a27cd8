//! Recursive unpack driver (C7, §4.6) — the heart of the system.
//!
//! Feeds a root `File` to the router; if it is an archive, enumerates
//! members and recurses; if it is a file decoder's match, decodes and
//! recurses on the output; if unrecognized, emits the bytes verbatim.
//! Naming lineage is threaded through the recursion as described in
//! DESIGN.md's resolution of the naming-strategy open question: the
//! `parent_path` fed to [`crate::naming::resolve`] is empty for the user's
//! root input (it occupies no slot of its own in the destination tree) and
//! becomes each archive's own resolved path for its descendants.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::decoder::{Decoder, DecoderId};
use crate::error::Result;
use crate::file::File;
use crate::naming::{self, NamingStrategy};
use crate::registry::Registry;
use crate::router::Router;
use crate::sink::{DecodeLogger, DedupingSink, EventKind, Sink};

pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Cooperative cancellation, checked at entry boundaries and between
/// recursion levels (§5 "Cancellation").
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Overrides available to the CLI (`--format`, `--naming`, `--max-depth`).
#[derive(Default, Clone)]
pub struct DriverOptions {
    pub forced_decoder: Option<DecoderId>,
    pub naming_override: Option<NamingStrategy>,
    pub max_depth: Option<usize>,
}

/// Drives a single root `File` to completion. Single-threaded, cooperative,
/// deterministic within this root (§5). A batch of roots is driven by
/// constructing one `UnpackDriver` (and one disjoint `DedupingSink`) per
/// root and running them across a rayon thread pool — see
/// `main::run_unpack`.
pub struct UnpackDriver<'a, S: Sink> {
    registry: &'a Registry,
    sink: &'a DedupingSink<S>,
    logger: &'a dyn DecodeLogger,
    options: DriverOptions,
    cancellation: CancellationToken,
}

impl<'a, S: Sink> UnpackDriver<'a, S> {
    pub fn new(
        registry: &'a Registry,
        sink: &'a DedupingSink<S>,
        logger: &'a dyn DecodeLogger,
        options: DriverOptions,
        cancellation: CancellationToken,
    ) -> Self {
        Self { registry, sink, logger, options, cancellation }
    }

    pub fn max_depth(&self) -> usize {
        self.options.max_depth.unwrap_or(DEFAULT_MAX_DEPTH)
    }

    /// Runs the driver to completion on `root`. If `--format` forced a
    /// decoder id, recognition for the root file bypasses the registry
    /// entirely (§6) — only descendants fall back to ordinary
    /// hint-then-registry recognition.
    pub fn run(&self, root: File) -> Result<()> {
        match &self.options.forced_decoder {
            Some(id) => self.unpack_forced(root, id.clone(), 0, ""),
            None => self.unpack(root, &[], 0, ""),
        }
    }

    fn emit_verbatim(&self, file: &File) -> Result<()> {
        let mut stream = file.stream.clone();
        stream.seek(0)?;
        let bytes = stream.read_to_eof();
        let path = self.sink.reserve_path(&file.path);
        self.sink.write(&path, &bytes)?;
        Ok(())
    }

    /// Recognizes `file` against only `forced`, with no fallback to the
    /// rest of the registry (§6 `--format` bypass), then dispatches as
    /// `unpack` would. Used for the root file only; anything this
    /// produces recurses through ordinary `unpack`.
    fn unpack_forced(&self, file: File, forced: DecoderId, depth: usize, naming_parent: &str) -> Result<()> {
        if self.cancellation.is_cancelled() {
            return Ok(());
        }
        if depth > self.max_depth() {
            return self.demote_for_depth(&file, depth);
        }
        let router = Router::new(self.registry);
        let routed = router.route_forced(&file, &forced)?;
        self.dispatch(file, routed, depth, naming_parent)
    }

    fn demote_for_depth(&self, file: &File, depth: usize) -> Result<()> {
        self.logger.log(
            EventKind::DepthExceeded,
            &file.path,
            None,
            &format!("recursion depth {depth} exceeds max-depth {}, emitting verbatim", self.max_depth()),
        );
        self.emit_verbatim(file)
    }

    fn unpack(&self, file: File, hints: &[DecoderId], depth: usize, naming_parent: &str) -> Result<()> {
        if self.cancellation.is_cancelled() {
            return Ok(());
        }
        if depth > self.max_depth() {
            return self.demote_for_depth(&file, depth);
        }

        let router = Router::new(self.registry);
        let routed = router.route(&file, hints)?;
        self.dispatch(file, routed, depth, naming_parent)
    }

    fn dispatch(
        &self,
        file: File,
        routed: Option<(DecoderId, &Decoder)>,
        depth: usize,
        naming_parent: &str,
    ) -> Result<()> {
        match routed {
            None => {
                self.logger.log(EventKind::UnrecognizedInput, &file.path, None, "no decoder recognized this input");
                self.emit_verbatim(&file)
            }
            Some((id, Decoder::File(decoder))) => match decoder.decode(&file) {
                Ok(out_file) => {
                    if self.cancellation.is_cancelled() {
                        return Ok(());
                    }
                    self.unpack(out_file.clone(), decoder.linked_formats(), depth + 1, &out_file.path)
                }
                Err(err) => {
                    self.logger.log(EventKind::CorruptData, &file.path, Some(&id), &err.to_string());
                    self.emit_verbatim(&file)
                }
            },
            Some((id, Decoder::Archive(decoder))) => {
                let meta = match decoder.read_meta(&file) {
                    Ok(meta) => meta,
                    Err(err) => {
                        // Fatal at the meta phase (§7): abort *this* archive's
                        // subtree, but let sibling subtrees elsewhere continue.
                        self.logger.log(EventKind::CorruptData, &file.path, Some(&id), &err.to_string());
                        return Ok(());
                    }
                };

                let strategy = self.options.naming_override.unwrap_or_else(|| decoder.naming_strategy());
                let base = naming::fallback_base(strategy, &file.path, file.stem());
                let nameless_total = meta.entries.iter().filter(|e| e.stored_path().is_empty()).count();
                let width = digit_width(nameless_total);

                let mut used_in_archive: HashSet<String> = HashSet::new();
                let mut nameless_index = 0usize;

                for entry in &meta.entries {
                    if self.cancellation.is_cancelled() {
                        break;
                    }
                    let member = match decoder.read_file(&file, &meta, entry.as_ref()) {
                        Ok(member) => member,
                        Err(err) => {
                            // Fatal only for this member (§7): skip it, keep
                            // processing the rest of the archive.
                            self.logger.log(EventKind::CorruptData, &file.path, Some(&id), &err.to_string());
                            continue;
                        }
                    };

                    let raw_name = if member.path.is_empty() {
                        let name = if meta.entries.len() == 1 {
                            format!("{base}.dat")
                        } else {
                            format!("{base}_{:0width$}.dat", nameless_index, width = width)
                        };
                        nameless_index += 1;
                        name
                    } else {
                        member.path.clone()
                    };

                    let resolved = naming::resolve(strategy, naming_parent, &raw_name);
                    let deduped = dedup_within_archive(&mut used_in_archive, &resolved);
                    let member_file = File::new(deduped.clone(), member.stream);
                    self.unpack(member_file, decoder.linked_formats(), depth + 1, &deduped)?;
                }
                Ok(())
            }
        }
    }
}

/// The number of decimal digits needed to print `n` — `digit_width(10) ==
/// 2`, matching the worked examples in spec.md §8 (10 nameless entries pad
/// to 2 digits, 100 pad to 3), rather than the literal
/// `max(1, ceil(log10(n)))` formula in spec.md §4.6, which is off by one at
/// exact powers of ten. See DESIGN.md for the reconciliation.
fn digit_width(n: usize) -> usize {
    if n <= 1 {
        1
    } else {
        n.to_string().len()
    }
}

/// Within-archive collision resolution: suffix with `_<n>` for the
/// smallest unused non-negative `n` (§3 invariant 2, §4.6).
fn dedup_within_archive(used: &mut HashSet<String>, desired: &str) -> String {
    if used.insert(desired.to_string()) {
        return desired.to_string();
    }
    let (stem, ext) = match desired.rfind('.') {
        Some(0) | None => (desired, None),
        Some(dot) => (&desired[..dot], Some(&desired[dot + 1..])),
    };
    let mut n = 0u32;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{stem}_{n}.{ext}"),
            None => format!("{stem}_{n}"),
        };
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::{ArchiveDecoder, ArchiveEntry, ArchiveMeta, FileDecoder};
    use crate::sink::{MemorySink, RecordingLogger};
    use crate::stream::ByteStream;
    use std::any::Any;

    struct StubEntry {
        name: String,
        data: Vec<u8>,
    }

    impl ArchiveEntry for StubEntry {
        fn stored_path(&self) -> &str {
            &self.name
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Mirrors `archive_decoder_test.cc`'s `TestArchiveDecoder`: a trivial
    /// self-describing format, `name\0 size:u32LE data`, repeated to EOF.
    struct StubArchiveDecoder {
        strategy: NamingStrategy,
        extension: &'static str,
    }

    impl StubArchiveDecoder {
        fn new(strategy: NamingStrategy) -> Self {
            Self { strategy, extension: "archive" }
        }
    }

    impl ArchiveDecoder for StubArchiveDecoder {
        fn recognize(&self, file: &File) -> Result<bool> {
            Ok(file.path.ends_with(self.extension))
        }

        fn read_meta(&self, file: &File) -> Result<ArchiveMeta> {
            let mut stream = file.stream.clone();
            stream.seek(0)?;
            let mut entries: Vec<Box<dyn ArchiveEntry>> = Vec::new();
            while !stream.eof() {
                let name = String::from_utf8(stream.read_to_zero(None)?).unwrap();
                let size = stream.read_u32_le()? as usize;
                let data = stream.read(size)?;
                entries.push(Box::new(StubEntry { name, data }));
            }
            Ok(ArchiveMeta::new(entries))
        }

        fn read_file(&self, _file: &File, _meta: &ArchiveMeta, entry: &dyn ArchiveEntry) -> Result<File> {
            let entry = entry.as_any().downcast_ref::<StubEntry>().unwrap();
            Ok(File::from_bytes(entry.name.clone(), entry.data.clone()))
        }

        fn naming_strategy(&self) -> NamingStrategy {
            self.strategy
        }
    }

    fn make_archive(path: &str, files: &[(&str, &[u8])]) -> File {
        let mut bytes = Vec::new();
        for (name, data) in files {
            bytes.extend_from_slice(name.as_bytes());
            bytes.push(0);
            bytes.extend_from_slice(&(data.len() as u32).to_le_bytes());
            bytes.extend_from_slice(data);
        }
        File::from_bytes(path, bytes)
    }

    fn registry_with(strategy: NamingStrategy) -> Registry {
        let mut registry = Registry::new();
        registry
            .register(DecoderId::from("test/archive"), Decoder::Archive(Box::new(StubArchiveDecoder::new(strategy))))
            .unwrap();
        registry
    }

    #[test]
    fn nested_path_preserved() {
        let registry = registry_with(NamingStrategy::Child);
        let archive = make_archive("test.archive", &[("deeply/nested/file.txt", b"abc")]);

        let sink = DedupingSink::new(MemorySink::new());
        let logger = RecordingLogger::new();
        let driver = UnpackDriver::new(&registry, &sink, &logger, DriverOptions::default(), CancellationToken::new());
        driver.run(archive).unwrap();

        let files = sink.into_inner().into_files();
        assert_eq!(files, vec![("deeply/nested/file.txt".to_string(), b"abc".to_vec())]);
    }

    #[test]
    fn collision_gets_suffixed() {
        let registry = registry_with(NamingStrategy::Child);
        let archive = make_archive("test.archive", &[("a.dat", b"1"), ("a.dat", b"2")]);

        let sink = DedupingSink::new(MemorySink::new());
        let logger = RecordingLogger::new();
        let driver = UnpackDriver::new(&registry, &sink, &logger, DriverOptions::default(), CancellationToken::new());
        driver.run(archive).unwrap();

        let files = sink.into_inner().into_files();
        assert_eq!(files[0].0, "a.dat");
        assert_eq!(files[1].0, "a_0.dat");
    }

    fn fallback_names(strategy: NamingStrategy, archive_path: &str, count: usize) -> Vec<String> {
        let registry = registry_with(strategy);
        let members: Vec<(&str, &[u8])> = (0..count).map(|_| ("", &b""[..])).collect();
        let archive = make_archive(archive_path, &members);

        let sink = DedupingSink::new(MemorySink::new());
        let logger = RecordingLogger::new();
        let driver = UnpackDriver::new(&registry, &sink, &logger, DriverOptions::default(), CancellationToken::new());
        driver.run(archive).unwrap();
        sink.into_inner().into_files().into_iter().map(|(p, _)| p).collect()
    }

    #[test]
    fn child_one_nameless() {
        assert_eq!(fallback_names(NamingStrategy::Child, "path/test.archive", 1), vec!["unk.dat"]);
    }

    #[test]
    fn child_two_nameless() {
        assert_eq!(fallback_names(NamingStrategy::Child, "path/test.archive", 2), vec!["unk_0.dat", "unk_1.dat"]);
    }

    #[test]
    fn root_two_nameless() {
        assert_eq!(
            fallback_names(NamingStrategy::Root, "path/test.archive", 2),
            vec!["path/test_0.dat", "path/test_1.dat"]
        );
    }

    #[test]
    fn sibling_two_nameless() {
        assert_eq!(fallback_names(NamingStrategy::Sibling, "path/test.archive", 2), vec!["test_0.dat", "test_1.dat"]);
    }

    #[test]
    fn digit_width_boundaries() {
        assert_eq!(fallback_names(NamingStrategy::Child, "path/test.archive", 9).last().unwrap(), "unk_8.dat");
        assert_eq!(fallback_names(NamingStrategy::Child, "path/test.archive", 10).last().unwrap(), "unk_09.dat");
        assert_eq!(fallback_names(NamingStrategy::Child, "path/test.archive", 11).last().unwrap(), "unk_10.dat");
        assert_eq!(fallback_names(NamingStrategy::Child, "path/test.archive", 99).last().unwrap(), "unk_98.dat");
        assert_eq!(fallback_names(NamingStrategy::Child, "path/test.archive", 100).last().unwrap(), "unk_099.dat");
    }

    #[test]
    fn mixed_nameless_and_named() {
        let registry = registry_with(NamingStrategy::Child);
        let archive = make_archive("path/test.archive", &[("", b""), ("named", b""), ("", b"")]);

        let sink = DedupingSink::new(MemorySink::new());
        let logger = RecordingLogger::new();
        let driver = UnpackDriver::new(&registry, &sink, &logger, DriverOptions::default(), CancellationToken::new());
        driver.run(archive).unwrap();

        let paths: Vec<String> = sink.into_inner().into_files().into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["unk_0.dat", "named", "unk_1.dat"]);
    }

    #[test]
    fn unrecognized_input_passes_through_verbatim() {
        let registry = Registry::new();
        let file = File::from_bytes("mystery.bin", vec![1, 2, 3]);

        let sink = DedupingSink::new(MemorySink::new());
        let logger = RecordingLogger::new();
        let driver = UnpackDriver::new(&registry, &sink, &logger, DriverOptions::default(), CancellationToken::new());
        driver.run(file).unwrap();

        assert_eq!(sink.into_inner().into_files(), vec![("mystery.bin".to_string(), vec![1, 2, 3])]);
    }

    #[test]
    fn forced_decoder_bypasses_fallback_to_a_matching_registry_decoder() {
        // `a.archive` is recognized by `StubArchiveDecoder` via its
        // extension, but forcing a different (never-matching) id must not
        // fall back to it: the root file is emitted verbatim instead.
        let registry = registry_with(NamingStrategy::Child);
        let archive = make_archive("a.archive", &[("member", b"x")]);

        let sink = DedupingSink::new(MemorySink::new());
        let logger = RecordingLogger::new();
        let options = DriverOptions { forced_decoder: Some(DecoderId::from("no/such-decoder")), ..Default::default() };
        let driver = UnpackDriver::new(&registry, &sink, &logger, options, CancellationToken::new());
        driver.run(archive).unwrap();

        let files = sink.into_inner().into_files();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].0, "a.archive");
    }

    #[test]
    fn forced_decoder_that_matches_still_recurses_normally() {
        let registry = registry_with(NamingStrategy::Child);
        let archive = make_archive("a.archive", &[("member", b"x")]);

        let sink = DedupingSink::new(MemorySink::new());
        let logger = RecordingLogger::new();
        let options = DriverOptions { forced_decoder: Some(DecoderId::from("test/archive")), ..Default::default() };
        let driver = UnpackDriver::new(&registry, &sink, &logger, options, CancellationToken::new());
        driver.run(archive).unwrap();

        let files = sink.into_inner().into_files();
        assert_eq!(files, vec![("member".to_string(), b"x".to_vec())]);
    }
}
