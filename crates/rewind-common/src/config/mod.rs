//! Trainer configuration model.
//!
//! One INI file describes one target executable: which process to watch,
//! which pointer chains to snapshot and restore, which fixed payloads to
//! write, and the keys that trigger each. Parsing case-folds executable
//! and module names on the way in and pre-builds the keybind dispatch
//! index used by the runtime.

pub mod ini;

use crate::error::{Error, Result};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

const REGION_POINTER_MARKER: &str = "pointer_";
const WRITE_POINTER_SUFFIX: &str = "pointer";
const WRITE_DATA_SUFFIX: &str = "data";

/// A pointer chain rooted at a module base.
///
/// `module` of `None` means the target's main executable. The first
/// offset is relative to the module base; later offsets are applied to
/// successively dereferenced pointers, except the final offset which is
/// a plain field offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointerSpec {
    /// Stable nickname, unique within its category.
    pub name: String,
    /// Case-folded module file name override, if any.
    pub module: Option<String>,
    /// Non-empty offset list.
    pub offsets: Vec<usize>,
}

/// A pointer chain plus the size of the region to snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionPointer {
    pub spec: PointerSpec,
    /// Region size in bytes, always positive.
    pub size: usize,
}

/// A pointer chain plus the payload written on trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePointer {
    pub spec: PointerSpec,
    pub data: Vec<u8>,
}

/// One `[SaveRestore]` section: a save key, a restore key, and the
/// regions they act on.
#[derive(Debug, Clone)]
pub struct SaveRestoreGroup {
    pub save_key: u8,
    pub restore_key: u8,
    pub pointers: Vec<RegionPointer>,
}

/// One `[Writer]` section: a trigger key and the payloads it writes.
#[derive(Debug, Clone)]
pub struct WriteAction {
    pub keybind: u8,
    pub pointers: Vec<WritePointer>,
}

/// Reference into a [`TargetSpec`]'s action lists, stored in the keybind
/// index so one key press can fan out to several sections in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionRef {
    SaveRestore(usize),
    Writer(usize),
}

/// Validated configuration for one target executable.
#[derive(Debug, Clone)]
pub struct TargetSpec {
    /// Case-folded executable base name.
    pub exe_name: String,
    /// Inactive specs are skipped by the agent.
    pub disabled: bool,
    pub save_restores: Vec<SaveRestoreGroup>,
    pub writers: Vec<WriteAction>,
    keybinds: HashMap<u8, Vec<ActionRef>>,
}

impl TargetSpec {
    /// Parse and validate a single target configuration.
    pub fn parse(input: &str) -> Result<TargetSpec> {
        let doc = ini::parse(input)?;
        build_target_spec(&doc)
    }

    /// Load a target configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<TargetSpec> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {}", path.display(), e)))?;
        TargetSpec::parse(&content).map_err(|e| with_path(e, path))
    }

    /// Actions bound to a virtual-key code, in configuration order.
    pub fn actions_for_key(&self, vk: u32) -> &[ActionRef] {
        u8::try_from(vk)
            .ok()
            .and_then(|key| self.keybinds.get(&key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Distinct module names referenced by any pointer, case-folded.
    /// The main executable is implicit and not included.
    pub fn required_module_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for group in &self.save_restores {
            for region in &group.pointers {
                if let Some(module) = &region.spec.module {
                    names.insert(module.clone());
                }
            }
        }
        for writer in &self.writers {
            for write in &writer.pointers {
                if let Some(module) = &write.spec.module {
                    names.insert(module.clone());
                }
            }
        }
        names
    }
}

/// A set of target specs loaded together.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub targets: Vec<TargetSpec>,
}

impl Config {
    /// Load one spec per file and run cross-spec validation.
    pub fn load_files<P: AsRef<Path>>(paths: impl IntoIterator<Item = P>) -> Result<Config> {
        let mut targets = Vec::new();
        for path in paths {
            targets.push(TargetSpec::from_file(path)?);
        }

        // Snapshot nicknames must be unique across every loaded spec so a
        // saved slot is unambiguously owned by one group.
        let mut seen: HashMap<&str, &str> = HashMap::new();
        for target in &targets {
            for group in &target.save_restores {
                for region in &group.pointers {
                    let name = region.spec.name.as_str();
                    if let Some(other_exe) = seen.insert(name, target.exe_name.as_str()) {
                        return Err(Error::Config(format!(
                            "snapshot pointer {:?} is declared for both {} and {}",
                            name, other_exe, target.exe_name
                        )));
                    }
                }
            }
        }

        Ok(Config { targets })
    }
}

fn with_path(err: Error, path: &Path) -> Error {
    match err {
        Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
        other => other,
    }
}

fn err_at(line: usize, message: impl AsRef<str>) -> Error {
    Error::Config(format!("line {} - {}", line, message.as_ref()))
}

fn build_target_spec(doc: &ini::Document) -> Result<TargetSpec> {
    let mut general: Option<(String, bool)> = None;
    let mut save_restores = Vec::new();
    let mut writers = Vec::new();
    let mut keybinds: HashMap<u8, Vec<ActionRef>> = HashMap::new();

    for section in &doc.sections {
        match section.name.to_ascii_lowercase().as_str() {
            "general" => {
                if general.is_some() {
                    return Err(err_at(section.line, "duplicate [General] section"));
                }
                general = Some(parse_general(section)?);
            }
            "saverestore" => {
                let group = parse_save_restore(section)?;
                let index = save_restores.len();
                keybinds
                    .entry(group.save_key)
                    .or_default()
                    .push(ActionRef::SaveRestore(index));
                keybinds
                    .entry(group.restore_key)
                    .or_default()
                    .push(ActionRef::SaveRestore(index));
                save_restores.push(group);
            }
            "writer" => {
                let writer = parse_writer(section)?;
                let index = writers.len();
                keybinds
                    .entry(writer.keybind)
                    .or_default()
                    .push(ActionRef::Writer(index));
                writers.push(writer);
            }
            other => {
                return Err(err_at(
                    section.line,
                    format!("unknown section [{}]", other),
                ));
            }
        }
    }

    let (exe_name, disabled) =
        general.ok_or_else(|| Error::Config("missing required section [General]".to_string()))?;

    validate_unique_nicknames(&save_restores, &writers)?;

    Ok(TargetSpec {
        exe_name,
        disabled,
        save_restores,
        writers,
        keybinds,
    })
}

fn parse_general(section: &ini::Section) -> Result<(String, bool)> {
    let mut exe_name: Option<String> = None;
    let mut disabled = false;

    for param in &section.params {
        match param.name.to_ascii_lowercase().as_str() {
            "exename" => {
                if exe_name.is_some() {
                    return Err(err_at(param.line, "duplicate exeName parameter"));
                }
                exe_name = Some(param.value.to_ascii_lowercase());
            }
            "disabled" => {
                disabled = parse_bool(&param.value)
                    .ok_or_else(|| err_at(param.line, "disabled must be a boolean"))?;
            }
            other => {
                return Err(err_at(
                    param.line,
                    format!("unknown parameter {:?} in [General]", other),
                ));
            }
        }
    }

    let exe_name = exe_name.ok_or_else(|| {
        err_at(section.line, "[General] is missing the exeName parameter")
    })?;

    Ok((exe_name, disabled))
}

fn parse_save_restore(section: &ini::Section) -> Result<SaveRestoreGroup> {
    let mut save_key: Option<u8> = None;
    let mut restore_key: Option<u8> = None;
    let mut pointers = Vec::new();

    for param in &section.params {
        let name = param.name.to_ascii_lowercase();
        match name.as_str() {
            "savestate" => {
                save_key = Some(keybind_from_value(&param.value, param.line)?);
            }
            "restorestate" => {
                restore_key = Some(keybind_from_value(&param.value, param.line)?);
            }
            _ => {
                let (nickname, size_str) = name.split_once(REGION_POINTER_MARKER).ok_or_else(
                    || {
                        err_at(
                            param.line,
                            format!("unknown parameter {:?} in [SaveRestore]", param.name),
                        )
                    },
                )?;
                if nickname.is_empty() {
                    return Err(err_at(param.line, "pointer is missing a nickname"));
                }
                if pointers
                    .iter()
                    .any(|r: &RegionPointer| r.spec.name == nickname)
                {
                    return Err(err_at(
                        param.line,
                        format!("pointer {:?} is declared twice", nickname),
                    ));
                }

                let size: usize = size_str.parse().map_err(|_| {
                    err_at(
                        param.line,
                        format!("invalid byte count {:?} in pointer name", size_str),
                    )
                })?;
                if size == 0 {
                    return Err(err_at(param.line, "pointer byte count must be positive"));
                }

                let spec = pointer_from_value(nickname, &param.value, param.line)?;
                pointers.push(RegionPointer { spec, size });
            }
        }
    }

    let save_key =
        save_key.ok_or_else(|| err_at(section.line, "[SaveRestore] is missing saveState"))?;
    let restore_key = restore_key
        .ok_or_else(|| err_at(section.line, "[SaveRestore] is missing restoreState"))?;

    if save_key == restore_key {
        return Err(err_at(
            section.line,
            "saveState and restoreState cannot share a keybind",
        ));
    }
    if pointers.is_empty() {
        return Err(err_at(section.line, "[SaveRestore] has no pointers"));
    }

    Ok(SaveRestoreGroup {
        save_key,
        restore_key,
        pointers,
    })
}

fn parse_writer(section: &ini::Section) -> Result<WriteAction> {
    struct Pending {
        name: String,
        spec: Option<PointerSpec>,
        data: Option<Vec<u8>>,
    }

    let mut keybind: Option<u8> = None;
    let mut pending: Vec<Pending> = Vec::new();

    fn entry<'a>(pending: &'a mut Vec<Pending>, name: &str) -> &'a mut Pending {
        match pending.iter().position(|p| p.name == name) {
            Some(pos) => &mut pending[pos],
            None => {
                pending.push(Pending {
                    name: name.to_string(),
                    spec: None,
                    data: None,
                });
                let last = pending.len() - 1;
                &mut pending[last]
            }
        }
    }

    for param in &section.params {
        let name = param.name.to_ascii_lowercase();
        if name == "keybind" {
            keybind = Some(keybind_from_value(&param.value, param.line)?);
        } else if let Some(nickname) = name.strip_suffix(WRITE_POINTER_SUFFIX) {
            if nickname.is_empty() {
                return Err(err_at(param.line, "write pointer is missing a nickname"));
            }
            let slot = entry(&mut pending, nickname);
            if slot.spec.is_some() {
                return Err(err_at(
                    param.line,
                    format!("write pointer {:?} is declared twice", nickname),
                ));
            }
            slot.spec = Some(pointer_from_value(nickname, &param.value, param.line)?);
        } else if let Some(nickname) = name.strip_suffix(WRITE_DATA_SUFFIX) {
            if nickname.is_empty() {
                return Err(err_at(param.line, "write data is missing a nickname"));
            }
            let data = decode_hex(&param.value)
                .ok_or_else(|| err_at(param.line, "data is not valid hex"))?;
            if data.is_empty() {
                return Err(err_at(param.line, "data payload is empty"));
            }
            let slot = entry(&mut pending, nickname);
            if slot.data.is_some() {
                return Err(err_at(
                    param.line,
                    format!("write data {:?} is declared twice", nickname),
                ));
            }
            slot.data = Some(data);
        } else {
            return Err(err_at(
                param.line,
                format!("unknown parameter {:?} in [Writer]", param.name),
            ));
        }
    }

    let keybind = keybind.ok_or_else(|| err_at(section.line, "[Writer] is missing keybind"))?;
    if pending.is_empty() {
        return Err(err_at(section.line, "[Writer] has no pointers"));
    }

    let mut pointers = Vec::with_capacity(pending.len());
    for slot in pending {
        let spec = slot.spec.ok_or_else(|| {
            err_at(
                section.line,
                format!("write data {:?} has no matching pointer", slot.name),
            )
        })?;
        let data = slot.data.ok_or_else(|| {
            err_at(
                section.line,
                format!("write pointer {:?} has no data payload", slot.name),
            )
        })?;
        pointers.push(WritePointer { spec, data });
    }

    Ok(WriteAction { keybind, pointers })
}

fn validate_unique_nicknames(
    save_restores: &[SaveRestoreGroup],
    writers: &[WriteAction],
) -> Result<()> {
    let mut snapshot_names = BTreeSet::new();
    for group in save_restores {
        for region in &group.pointers {
            if !snapshot_names.insert(region.spec.name.as_str()) {
                return Err(Error::Config(format!(
                    "pointer {:?} is already declared in a previous [SaveRestore] section",
                    region.spec.name
                )));
            }
        }
    }

    let mut write_names = BTreeSet::new();
    for writer in writers {
        for write in &writer.pointers {
            if !write_names.insert(write.spec.name.as_str()) {
                return Err(Error::Config(format!(
                    "write pointer {:?} is already declared in a previous [Writer] section",
                    write.spec.name
                )));
            }
        }
    }

    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

/// A keybind is written as a single ASCII character and compared against
/// virtual-key codes, which use the uppercase letter values.
fn keybind_from_value(value: &str, line: usize) -> Result<u8> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c.to_ascii_uppercase() as u8),
        _ => Err(err_at(line, "keybind must be a single ASCII character")),
    }
}

/// Pointer value syntax: an optional module name (recognized by the `.`
/// in its file name) followed by one or more base-16 offsets.
fn pointer_from_value(nickname: &str, value: &str, line: usize) -> Result<PointerSpec> {
    let mut fields = value.split_whitespace().peekable();

    let module = match fields.peek() {
        Some(first) if first.contains('.') => {
            let module = first.to_ascii_lowercase();
            fields.next();
            Some(module)
        }
        _ => None,
    };

    let mut offsets = Vec::new();
    for field in fields {
        let digits = field.strip_prefix("0x").unwrap_or(field);
        let offset = u64::from_str_radix(digits, 16)
            .ok()
            .and_then(|v| usize::try_from(v).ok())
            .ok_or_else(|| err_at(line, format!("invalid offset {:?}", field)))?;
        offsets.push(offset);
    }

    if offsets.is_empty() {
        return Err(err_at(line, "pointer has no offsets"));
    }

    Ok(PointerSpec {
        name: nickname.to_string(),
        module,
        offsets,
    })
}

/// Decode a hex payload. A leading `0x` is stripped and odd-length input
/// is left-padded with a `0`.
fn decode_hex(value: &str) -> Option<Vec<u8>> {
    let digits = value.strip_prefix("0x").unwrap_or(value);
    let padded;
    let digits = if digits.len() % 2 == 1 {
        padded = format!("0{}", digits);
        &padded
    } else {
        digits
    };

    let mut bytes = Vec::with_capacity(digits.len() / 2);
    let raw = digits.as_bytes();
    for pair in raw.chunks(2) {
        let text = std::str::from_utf8(pair).ok()?;
        bytes.push(u8::from_str_radix(text, 16).ok()?);
    }
    Some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASIC: &str = "\
[General]
exeName = Foo.exe

[SaveRestore]
xPointer_4 = 0x1000 0x20
saveState = 4
restoreState = 5
";

    #[test]
    fn test_parse_basic_spec() {
        let spec = TargetSpec::parse(BASIC).unwrap();
        assert_eq!(spec.exe_name, "foo.exe");
        assert!(!spec.disabled);
        assert_eq!(spec.save_restores.len(), 1);

        let group = &spec.save_restores[0];
        assert_eq!(group.save_key, b'4');
        assert_eq!(group.restore_key, b'5');
        assert_eq!(group.pointers.len(), 1);
        assert_eq!(group.pointers[0].spec.name, "x");
        assert_eq!(group.pointers[0].spec.offsets, vec![0x1000, 0x20]);
        assert_eq!(group.pointers[0].size, 4);
        assert_eq!(group.pointers[0].spec.module, None);
    }

    #[test]
    fn test_keybind_index() {
        let spec = TargetSpec::parse(BASIC).unwrap();
        assert_eq!(spec.actions_for_key(b'4' as u32), &[ActionRef::SaveRestore(0)]);
        assert_eq!(spec.actions_for_key(b'5' as u32), &[ActionRef::SaveRestore(0)]);
        assert!(spec.actions_for_key(b'9' as u32).is_empty());
        assert!(spec.actions_for_key(0x10000).is_empty());
    }

    #[test]
    fn test_writer_section() {
        let spec = TargetSpec::parse(
            "[General]\n\
             exeName = bar.exe\n\
             [Writer]\n\
             posPointer = 0x2000 0x10 0x08\n\
             posData = CAFE\n\
             keybind = p\n",
        )
        .unwrap();

        assert_eq!(spec.writers.len(), 1);
        let writer = &spec.writers[0];
        assert_eq!(writer.keybind, b'P');
        assert_eq!(writer.pointers.len(), 1);
        assert_eq!(writer.pointers[0].spec.name, "pos");
        assert_eq!(writer.pointers[0].spec.offsets, vec![0x2000, 0x10, 0x08]);
        assert_eq!(writer.pointers[0].data, vec![0xCA, 0xFE]);
        assert_eq!(spec.actions_for_key(b'P' as u32), &[ActionRef::Writer(0)]);
    }

    #[test]
    fn test_module_override() {
        let spec = TargetSpec::parse(
            "[General]\n\
             exeName = foo.exe\n\
             [SaveRestore]\n\
             hpPointer_2 = Physics.DLL 0x40 0x8\n\
             saveState = 1\n\
             restoreState = 2\n",
        )
        .unwrap();

        let region = &spec.save_restores[0].pointers[0];
        assert_eq!(region.spec.module.as_deref(), Some("physics.dll"));
        assert_eq!(region.spec.offsets, vec![0x40, 0x8]);
        assert_eq!(
            spec.required_module_names().into_iter().collect::<Vec<_>>(),
            vec!["physics.dll".to_string()]
        );
    }

    #[test]
    fn test_odd_length_data_padded() {
        let spec = TargetSpec::parse(
            "[General]\n\
             exeName = foo.exe\n\
             [Writer]\n\
             xPointer = 0x10\n\
             xData = 0xFFF\n\
             keybind = k\n",
        )
        .unwrap();
        assert_eq!(spec.writers[0].pointers[0].data, vec![0x0F, 0xFF]);
    }

    #[test]
    fn test_disabled_flag() {
        let spec = TargetSpec::parse(
            "[General]\nexeName = foo.exe\ndisabled = true\n",
        )
        .unwrap();
        assert!(spec.disabled);

        assert!(TargetSpec::parse(
            "[General]\nexeName = foo.exe\ndisabled = maybe\n"
        )
        .is_err());
    }

    #[test]
    fn test_same_save_and_restore_key_rejected() {
        let err = TargetSpec::parse(
            "[General]\n\
             exeName = foo.exe\n\
             [SaveRestore]\n\
             xPointer_4 = 0x10\n\
             saveState = 4\n\
             restoreState = 4\n",
        )
        .unwrap_err();
        assert!(format!("{}", err).contains("share a keybind"));
    }

    #[test]
    fn test_duplicate_nickname_across_groups_rejected() {
        let err = TargetSpec::parse(
            "[General]\n\
             exeName = foo.exe\n\
             [SaveRestore]\n\
             xPointer_4 = 0x10\n\
             saveState = 1\n\
             restoreState = 2\n\
             [SaveRestore]\n\
             xPointer_4 = 0x20\n\
             saveState = 3\n\
             restoreState = 4\n",
        )
        .unwrap_err();
        assert!(format!("{}", err).contains("previous [SaveRestore]"));
    }

    #[test]
    fn test_duplicate_write_nickname_across_sections_rejected() {
        let err = TargetSpec::parse(
            "[General]\n\
             exeName = foo.exe\n\
             [Writer]\n\
             xPointer = 0x10\n\
             xData = 01\n\
             keybind = a\n\
             [Writer]\n\
             xPointer = 0x20\n\
             xData = 02\n\
             keybind = b\n",
        )
        .unwrap_err();
        assert!(format!("{}", err).contains("previous [Writer]"));
    }

    #[test]
    fn test_writer_missing_data_rejected() {
        let err = TargetSpec::parse(
            "[General]\n\
             exeName = foo.exe\n\
             [Writer]\n\
             xPointer = 0x10\n\
             keybind = a\n",
        )
        .unwrap_err();
        assert!(format!("{}", err).contains("no data payload"));
    }

    #[test]
    fn test_writer_data_without_pointer_rejected() {
        let err = TargetSpec::parse(
            "[General]\n\
             exeName = foo.exe\n\
             [Writer]\n\
             xData = 01\n\
             keybind = a\n",
        )
        .unwrap_err();
        assert!(format!("{}", err).contains("no matching pointer"));
    }

    #[test]
    fn test_missing_general_rejected() {
        let err = TargetSpec::parse("[SaveRestore]\nxPointer_4 = 0x10\nsaveState = 1\nrestoreState = 2\n")
            .unwrap_err();
        assert!(format!("{}", err).contains("[General]"));
    }

    #[test]
    fn test_zero_byte_count_rejected() {
        let err = TargetSpec::parse(
            "[General]\n\
             exeName = foo.exe\n\
             [SaveRestore]\n\
             xPointer_0 = 0x10\n\
             saveState = 1\n\
             restoreState = 2\n",
        )
        .unwrap_err();
        assert!(format!("{}", err).contains("positive"));
    }

    #[test]
    fn test_pointer_without_offsets_rejected() {
        let err = TargetSpec::parse(
            "[General]\n\
             exeName = foo.exe\n\
             [SaveRestore]\n\
             xPointer_4 = physics.dll\n\
             saveState = 1\n\
             restoreState = 2\n",
        )
        .unwrap_err();
        assert!(format!("{}", err).contains("no offsets"));
    }

    #[test]
    fn test_two_sections_in_file_order() {
        let spec = TargetSpec::parse(
            "[General]\n\
             exeName = foo.exe\n\
             [SaveRestore]\n\
             aPointer_4 = 0x10\n\
             saveState = 1\n\
             restoreState = 2\n\
             [Writer]\n\
             bPointer = 0x20\n\
             bData = 99\n\
             keybind = 1\n",
        )
        .unwrap();

        // Both sections fire on key '1', save-restore first.
        assert_eq!(
            spec.actions_for_key(b'1' as u32),
            &[ActionRef::SaveRestore(0), ActionRef::Writer(0)]
        );
    }

    #[test]
    fn test_cross_spec_nickname_collision() {
        use std::io::Write;

        let dir = std::env::temp_dir().join("rewind-config-test");
        std::fs::create_dir_all(&dir).unwrap();
        let a = dir.join("a.conf");
        let b = dir.join("b.conf");

        let mut fa = std::fs::File::create(&a).unwrap();
        write!(
            fa,
            "[General]\nexeName = a.exe\n[SaveRestore]\nxPointer_4 = 0x10\nsaveState = 1\nrestoreState = 2\n"
        )
        .unwrap();
        let mut fb = std::fs::File::create(&b).unwrap();
        write!(
            fb,
            "[General]\nexeName = b.exe\n[SaveRestore]\nxPointer_4 = 0x10\nsaveState = 1\nrestoreState = 2\n"
        )
        .unwrap();

        let err = Config::load_files([&a, &b]).unwrap_err();
        assert!(format!("{}", err).contains("declared for both"));

        let ok = Config::load_files([&a]).unwrap();
        assert_eq!(ok.targets.len(), 1);
    }

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex("CAFE"), Some(vec![0xCA, 0xFE]));
        assert_eq!(decode_hex("0xCAFE"), Some(vec![0xCA, 0xFE]));
        assert_eq!(decode_hex("FFF"), Some(vec![0x0F, 0xFF]));
        assert_eq!(decode_hex("zz"), None);
    }
}
