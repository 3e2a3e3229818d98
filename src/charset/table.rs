//! Static charset data: the server-name ↔ host-encoding table, the
//! error-message language table, and the wire collation-index layout.
//!
//! MySQL identifies a connection charset three ways (name, collation ID,
//! language directory) and none of them line up cleanly; see the notes on
//! [`crate::charset`]. Everything here is immutable after construction.

/// One server charset mapped to one host encoding label.
#[derive(Debug, Copy, Clone)]
pub(super) struct CharsetEntry {
    /// Canonical (lowercase) server charset name.
    pub(super) server: &'static str,

    /// Host encoding label; WHATWG where one exists, a registry-only name
    /// otherwise (cp850, swe7, …) that converts through the single-byte
    /// fallback.
    pub(super) host: &'static str,

    /// Minimum server version for this mapping to apply.
    pub(super) since: Option<(u16, u16, u16)>,

    /// When several server names share one host encoding, exactly one
    /// entry is marked preferred for the inverse lookup.
    pub(super) preferred: bool,

    /// Naive byte escaping can corrupt values in this encoding.
    pub(super) multibyte: bool,
}

impl CharsetEntry {
    const fn new(server: &'static str, host: &'static str) -> Self {
        Self { server, host, since: None, preferred: false, multibyte: false }
    }

    const fn since(self, major: u16, minor: u16, patch: u16) -> Self {
        Self { since: Some((major, minor, patch)), ..self }
    }

    const fn preferred(self) -> Self {
        Self { preferred: true, ..self }
    }

    const fn multibyte(self) -> Self {
        Self { multibyte: true, ..self }
    }
}

/// The full registry. Order matters: forward lookups take the first
/// version-satisfied entry per server name, so newer mappings come first.
pub(super) static CHARSETS: &[CharsetEntry] = &[
    CharsetEntry::new("usa7", "us-ascii"),
    CharsetEntry::new("ascii", "us-ascii").since(4, 1, 0).preferred(),
    CharsetEntry::new("big5", "big5").multibyte().preferred(),
    CharsetEntry::new("gbk", "gbk").multibyte().preferred(),
    CharsetEntry::new("gb2312", "gb2312").multibyte().preferred(),
    CharsetEntry::new("gb18030", "gb18030").since(5, 7, 4).multibyte().preferred(),
    CharsetEntry::new("sjis", "shift_jis").multibyte().preferred(),
    CharsetEntry::new("cp932", "windows-31j").since(4, 1, 12).multibyte().preferred(),
    CharsetEntry::new("ujis", "euc-jp").multibyte().preferred(),
    CharsetEntry::new("eucjpms", "eucjpms").since(5, 0, 3).multibyte().preferred(),
    CharsetEntry::new("euckr", "euc-kr").multibyte().preferred(),
    // latin1 on a 4.1+ server is actually the Windows-1252 superset; the
    // strict ISO mapping only holds for older servers.
    CharsetEntry::new("latin1", "windows-1252").since(4, 1, 0).preferred(),
    CharsetEntry::new("latin1", "iso-8859-1"),
    CharsetEntry::new("latin2", "iso-8859-2").preferred(),
    CharsetEntry::new("greek", "iso-8859-7").preferred(),
    CharsetEntry::new("hebrew", "iso-8859-8").preferred(),
    CharsetEntry::new("latin5", "iso-8859-9").preferred(),
    CharsetEntry::new("latin7", "iso-8859-13").preferred(),
    CharsetEntry::new("tis620", "tis-620").preferred(),
    CharsetEntry::new("cp866", "ibm866").preferred(),
    CharsetEntry::new("koi8r", "koi8-r").preferred(),
    CharsetEntry::new("koi8u", "koi8-u").preferred(),
    CharsetEntry::new("cp1250", "windows-1250").since(4, 1, 0).preferred(),
    CharsetEntry::new("win1250", "windows-1250"),
    CharsetEntry::new("cp1251", "windows-1251").since(4, 1, 0).preferred(),
    CharsetEntry::new("win1251", "windows-1251"),
    CharsetEntry::new("win1251ukr", "windows-1251"),
    CharsetEntry::new("cp1256", "windows-1256").preferred(),
    CharsetEntry::new("cp1257", "windows-1257").preferred(),
    CharsetEntry::new("cp850", "cp850").preferred(),
    CharsetEntry::new("cp852", "cp852").preferred(),
    CharsetEntry::new("macroman", "macintosh").preferred(),
    CharsetEntry::new("macce", "x-mac-ce").preferred(),
    CharsetEntry::new("utf8", "utf-8").multibyte().preferred(),
    CharsetEntry::new("utf8mb4", "utf-8").since(5, 5, 3).multibyte(),
    CharsetEntry::new("ucs2", "utf-16be").since(4, 1, 0).multibyte().preferred(),
    CharsetEntry::new("utf16", "utf-16be").since(5, 5, 0).multibyte(),
    CharsetEntry::new("utf16le", "utf-16le").since(5, 6, 0).multibyte().preferred(),
    CharsetEntry::new("utf32", "utf-32be").since(5, 5, 0).multibyte().preferred(),
    // binary columns are never transcoded; treat the bytes as Latin-1 so
    // every byte value round-trips through a host string.
    CharsetEntry::new("binary", "iso-8859-1").preferred(),
    CharsetEntry::new("swe7", "swe7").preferred(),
    CharsetEntry::new("dec8", "dec8").preferred(),
    CharsetEntry::new("hp8", "hp8").preferred(),
    CharsetEntry::new("armscii8", "armscii-8").preferred(),
    CharsetEntry::new("geostd8", "geostd8").preferred(),
    CharsetEntry::new("keybcs2", "keybcs2").preferred(),
];

/// Server error-message language directory → server charset of the
/// compiled-in message catalog.
pub(super) static LANGUAGE_TO_CHARSET: &[(&str, &str)] = &[
    ("czech", "latin2"),
    ("danish", "latin1"),
    ("dutch", "latin1"),
    ("english", "latin1"),
    ("estonian", "latin7"),
    ("french", "latin1"),
    ("german", "latin1"),
    ("greek", "greek"),
    ("hungarian", "latin2"),
    ("italian", "latin1"),
    ("japanese", "ujis"),
    ("japanese-sjis", "sjis"),
    ("korean", "euckr"),
    ("norwegian", "latin1"),
    ("norwegian-ny", "latin1"),
    ("polish", "latin2"),
    ("portuguese", "latin1"),
    ("romanian", "latin2"),
    ("russian", "koi8r"),
    ("serbian", "cp1250"),
    ("slovak", "latin2"),
    ("spanish", "latin1"),
    ("swedish", "latin1"),
    ("ukrainian", "win1251ukr"),
];

/// Highest wire collation index the engine distinguishes.
pub(super) const COLLATION_INDEX_MAX: usize = 210;

/// Individually assigned collation indices, by server charset name.
///
/// The classic block (1..=99) is sequential-with-gaps; the `_bin` and
/// extension block starts at 64.
pub(super) static COLLATION_INDEX: &[(u16, &str)] = &[
    (1, "big5"),
    (2, "latin2"),
    (3, "dec8"),
    (4, "cp850"),
    (5, "latin1"),
    (6, "hp8"),
    (7, "koi8r"),
    (8, "latin1"),
    (9, "latin2"),
    (10, "swe7"),
    (11, "usa7"),
    (12, "ujis"),
    (13, "sjis"),
    (14, "cp1251"),
    (15, "latin1"),
    (16, "hebrew"),
    (18, "tis620"),
    (19, "euckr"),
    (20, "latin7"),
    (21, "latin2"),
    (22, "koi8u"),
    (23, "win1251ukr"),
    (24, "gb2312"),
    (25, "greek"),
    (26, "cp1250"),
    (27, "latin2"),
    (28, "gbk"),
    (29, "cp1257"),
    (30, "latin5"),
    (31, "latin1"),
    (32, "armscii8"),
    (33, "utf8"),
    (34, "cp1250"),
    (35, "ucs2"),
    (36, "cp866"),
    (37, "keybcs2"),
    (38, "macce"),
    (39, "macroman"),
    (40, "cp852"),
    (41, "latin7"),
    (42, "latin7"),
    (43, "macce"),
    (44, "cp1250"),
    (45, "utf8mb4"),
    (46, "utf8mb4"),
    (47, "latin1"),
    (48, "latin1"),
    (49, "latin1"),
    (50, "cp1251"),
    (51, "cp1251"),
    (52, "cp1251"),
    (53, "macroman"),
    (54, "utf16"),
    (55, "utf16"),
    (56, "utf16le"),
    (57, "cp1256"),
    (58, "cp1257"),
    (59, "cp1257"),
    (60, "utf32"),
    (61, "utf32"),
    (62, "utf16le"),
    (63, "binary"),
    (64, "armscii8"),
    (65, "ascii"),
    (66, "cp1250"),
    (67, "cp1256"),
    (68, "cp866"),
    (69, "dec8"),
    (70, "greek"),
    (71, "hebrew"),
    (72, "hp8"),
    (73, "keybcs2"),
    (74, "koi8r"),
    (75, "koi8u"),
    (77, "latin2"),
    (78, "latin5"),
    (79, "latin7"),
    (80, "cp850"),
    (81, "cp852"),
    (82, "swe7"),
    (83, "utf8"),
    (84, "big5"),
    (85, "euckr"),
    (86, "gb2312"),
    (87, "gbk"),
    (88, "sjis"),
    (89, "tis620"),
    (90, "ucs2"),
    (91, "ujis"),
    (92, "geostd8"),
    (93, "geostd8"),
    (94, "latin1"),
    (95, "cp932"),
    (96, "cp932"),
    (97, "eucjpms"),
    (98, "eucjpms"),
    (99, "cp1250"),
    (159, "ucs2"),
];

/// Contiguous collation blocks assigned per charset.
pub(super) static COLLATION_INDEX_RANGES: &[(u16, u16, &str)] = &[
    (101, 120, "utf16"),
    (128, 146, "ucs2"),
    (160, 179, "utf32"),
    (192, 210, "utf8"),
];

/// Indices the server reserves but the engine does not distinguish.
pub(super) static PUNTED_INDEXES: &[u16] = &[
    17, 76, 100, 121, 122, 123, 124, 125, 126, 127, 147, 148, 149, 150, 151, 152, 153, 154, 155,
    156, 157, 158, 180, 181, 182, 183, 184, 185, 186, 187, 188, 189, 190, 191,
];
