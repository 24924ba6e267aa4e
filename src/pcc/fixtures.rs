//! Synthetic package images for unit tests

use super::constants::PACKAGE_MAGIC;
use std::path::Path;

/// Class index of the GFxMovieInfo import in `movie_package`
pub(crate) const MOVIE_CLASS: i32 = -2;
/// Class index of the Package import in `movie_package`
pub(crate) const PACKAGE_CLASS: i32 = -3;

pub(crate) const FILLER: [u8; 4] = [0xF1, 0xF2, 0xF3, 0xF4];
pub(crate) const FOOTER: [u8; 6] = [0xEE, 0xED, 0xEC, 0xEB, 0xEA, 0xE9];

/// `[20-byte header][total][filler][len][payload][footer]`
pub(crate) fn payload_buffer(payload: &[u8]) -> Vec<u8> {
    let mut data: Vec<u8> = (0u8..20).collect();
    data.extend_from_slice(&(payload.len() as i32 + 4).to_le_bytes());
    data.extend_from_slice(&FILLER);
    data.extend_from_slice(&(payload.len() as i32).to_le_bytes());
    data.extend_from_slice(payload);
    data.extend_from_slice(&FOOTER);
    data
}

#[derive(Clone, Debug)]
pub(crate) struct FixtureImport {
    pub package_file: String,
    pub class: String,
    pub link: i32,
    pub object: String,
}

impl FixtureImport {
    pub(crate) fn new(package_file: &str, class: &str, link: i32, object: &str) -> Self {
        FixtureImport {
            package_file: package_file.to_string(),
            class: class.to_string(),
            link,
            object: object.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct FixtureExport {
    pub class_index: i32,
    pub super_index: i32,
    pub link: i32,
    pub name: String,
    pub number: i32,
    pub object_flags: u64,
    pub data: Vec<u8>,
}

impl FixtureExport {
    pub(crate) fn new(name: &str, class_index: i32, link: i32, data: Vec<u8>) -> Self {
        FixtureExport {
            class_index,
            super_index: 0,
            link,
            name: name.to_string(),
            number: 0,
            object_flags: 0,
            data,
        }
    }

    /// A GFxMovieInfo export carrying `payload`
    pub(crate) fn movie(name: &str, link: i32, number: i32, payload: Vec<u8>) -> Self {
        let mut export = Self::new(name, MOVIE_CLASS, link, payload_buffer(&payload));
        export.number = number;
        export
    }
}

#[derive(Clone, Debug)]
pub(crate) struct PackageFixture {
    pub names: Vec<String>,
    pub imports: Vec<FixtureImport>,
    pub exports: Vec<FixtureExport>,
    pub header_padding: Vec<u8>,
    pub depends: Vec<u8>,
    pub trailing: Vec<u8>,
}

fn intern(names: &mut Vec<String>, name: &str) -> i32 {
    if let Some(i) = names.iter().position(|n| n == name) {
        return i as i32;
    }
    names.push(name.to_string());
    names.len() as i32 - 1
}

fn wide_fstring(text: &str) -> Vec<u8> {
    let units: Vec<u16> = text.encode_utf16().chain(std::iter::once(0)).collect();
    let mut bytes = (-(units.len() as i32)).to_le_bytes().to_vec();
    for unit in units {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    bytes
}

impl PackageFixture {
    pub(crate) fn empty() -> Self {
        PackageFixture {
            names: vec!["None".to_string()],
            imports: Vec::new(),
            exports: Vec::new(),
            header_padding: vec![0xAB; 12],
            depends: vec![0u8; 8],
            trailing: Vec::new(),
        }
    }

    /// `GUI_Menu` package export holding two movies, `MainMenu` and `Options`
    pub(crate) fn movie_package() -> Self {
        let mut fixture = Self::empty();
        fixture.imports = vec![
            FixtureImport::new("Core", "Package", 0, "GFxUI"),
            FixtureImport::new("Core", "Class", -1, "GFxMovieInfo"),
            FixtureImport::new("Core", "Class", 0, "Package"),
        ];
        fixture.exports = vec![
            FixtureExport::new("GUI_Menu", PACKAGE_CLASS, 0, Vec::new()),
            FixtureExport::movie("MainMenu", 1, 0, b"FWS-main-menu".to_vec()),
            FixtureExport::movie("Options", 1, 0, b"FWS-options".to_vec()),
        ];
        fixture
    }

    /// Add a `SeekFreeShaderCache` export of class `ShaderCache`
    pub(crate) fn with_shader_cache(mut self) -> Self {
        self.imports
            .push(FixtureImport::new("Core", "Class", 0, "ShaderCache"));
        let class_index = -(self.imports.len() as i32);
        self.exports.push(FixtureExport::new(
            "SeekFreeShaderCache",
            class_index,
            0,
            vec![0x5C; 24],
        ));
        self
    }

    /// Serialize the package image
    pub(crate) fn build(&self) -> Vec<u8> {
        let mut names = self.names.clone();
        let import_refs: Vec<[i32; 3]> = self
            .imports
            .iter()
            .map(|imp| {
                [
                    intern(&mut names, &imp.package_file),
                    intern(&mut names, &imp.class),
                    intern(&mut names, &imp.object),
                ]
            })
            .collect();
        let export_names: Vec<i32> = self
            .exports
            .iter()
            .map(|exp| intern(&mut names, &exp.name))
            .collect();

        let name_table: Vec<u8> = names.iter().flat_map(|n| wide_fstring(n)).collect();
        let folder = wide_fstring("None");

        let header_len = 12 + folder.len() + 32 + self.header_padding.len();
        let name_offset = header_len;
        let import_offset = name_offset + name_table.len();
        let export_offset = import_offset + self.imports.len() * 28;
        let export_table_len = self.exports.len() * 72;
        let depends_offset = export_offset + export_table_len;
        let data_start = depends_offset + self.depends.len();

        let mut out = Vec::new();
        out.extend_from_slice(&PACKAGE_MAGIC.to_le_bytes());
        out.extend_from_slice(&684u16.to_le_bytes());
        out.extend_from_slice(&194u16.to_le_bytes());
        out.extend_from_slice(&(data_start as u32).to_le_bytes());
        out.extend_from_slice(&folder);
        for field in [
            0u32,
            names.len() as u32,
            name_offset as u32,
            self.exports.len() as u32,
            export_offset as u32,
            self.imports.len() as u32,
            import_offset as u32,
            depends_offset as u32,
        ] {
            out.extend_from_slice(&field.to_le_bytes());
        }
        out.extend_from_slice(&self.header_padding);
        out.extend_from_slice(&name_table);

        for (imp, refs) in self.imports.iter().zip(&import_refs) {
            out.extend_from_slice(&refs[0].to_le_bytes());
            out.extend_from_slice(&0i32.to_le_bytes());
            out.extend_from_slice(&refs[1].to_le_bytes());
            out.extend_from_slice(&0i32.to_le_bytes());
            out.extend_from_slice(&imp.link.to_le_bytes());
            out.extend_from_slice(&refs[2].to_le_bytes());
            out.extend_from_slice(&0i32.to_le_bytes());
        }

        let mut data_offset = data_start;
        for (exp, name) in self.exports.iter().zip(&export_names) {
            out.extend_from_slice(&exp.class_index.to_le_bytes());
            out.extend_from_slice(&exp.super_index.to_le_bytes());
            out.extend_from_slice(&exp.link.to_le_bytes());
            out.extend_from_slice(&name.to_le_bytes());
            out.extend_from_slice(&exp.number.to_le_bytes());
            out.extend_from_slice(&0i32.to_le_bytes()); // archetype
            out.extend_from_slice(&exp.object_flags.to_le_bytes());
            out.extend_from_slice(&(exp.data.len() as u32).to_le_bytes());
            out.extend_from_slice(&(data_offset as u32).to_le_bytes());
            out.extend_from_slice(&0i32.to_le_bytes()); // unknown
            out.extend_from_slice(&1i32.to_le_bytes()); // generation count
            out.extend_from_slice(&0x11u32.to_le_bytes());
            out.extend_from_slice(&[0x6D; 16]); // guid
            out.extend_from_slice(&0u32.to_le_bytes());
            data_offset += exp.data.len();
        }

        out.extend_from_slice(&self.depends);
        for exp in &self.exports {
            out.extend_from_slice(&exp.data);
        }
        out.extend_from_slice(&self.trailing);
        out
    }

    pub(crate) fn write_to(&self, path: &Path) {
        std::fs::write(path, self.build()).expect("write fixture package");
    }
}
