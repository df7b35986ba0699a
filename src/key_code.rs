//! The fixed scancode to key name table.
//!
//! Scancodes follow the numbering of [input-event-codes.h]. Named keys are rendered in angle
//! brackets, printable keys as their unshifted character.
//!
//! [input-event-codes.h]: https://elixir.bootlin.com/linux/v5.19.17/source/include/uapi/linux/input-event-codes.h#L64

/// The number of scancodes covered by [`KeycodeTable`].
pub const TABLE_SIZE: usize = 256;

const NAMES: &[(u16, &str)] = &[
    (1, "<esc>"),
    (2, "1"),
    (3, "2"),
    (4, "3"),
    (5, "4"),
    (6, "5"),
    (7, "6"),
    (8, "7"),
    (9, "8"),
    (10, "9"),
    (11, "0"),
    (12, "-"),
    (13, "="),
    (14, "<backspace>"),
    (15, "<tab>"),
    (16, "q"),
    (17, "w"),
    (18, "e"),
    (19, "r"),
    (20, "t"),
    (21, "y"),
    (22, "u"),
    (23, "i"),
    (24, "o"),
    (25, "p"),
    (26, "["),
    (27, "]"),
    (28, "\n"),
    (29, "<control>"),
    (30, "a"),
    (31, "s"),
    (32, "d"),
    (33, "f"),
    (34, "g"),
    (35, "h"),
    (36, "j"),
    (37, "k"),
    (38, "l"),
    (39, ";"),
    (40, "'"),
    (41, "`"),
    (42, "<shift>"),
    (43, "\\"),
    (44, "z"),
    (45, "x"),
    (46, "c"),
    (47, "v"),
    (48, "b"),
    (49, "n"),
    (50, "m"),
    (51, ","),
    (52, "."),
    (53, "/"),
    (54, "<shift>"),
    (55, "*"),
    (56, "<alt>"),
    (57, " "),
    (58, "<capslock>"),
    (59, "<f1>"),
    (60, "<f2>"),
    (61, "<f3>"),
    (62, "<f4>"),
    (63, "<f5>"),
    (64, "<f6>"),
    (65, "<f7>"),
    (66, "<f8>"),
    (67, "<f9>"),
    (68, "<f10>"),
    (69, "<numlock>"),
    (70, "<scrolllock>"),
    // Keypad
    (71, "7"),
    (72, "8"),
    (73, "9"),
    (74, "-"),
    (75, "4"),
    (76, "5"),
    (77, "6"),
    (78, "+"),
    (79, "1"),
    (80, "2"),
    (81, "3"),
    (82, "0"),
    (83, "."),
    (86, "\\"),
    (87, "<f11>"),
    (88, "<f12>"),
    (96, "\n"),
    (97, "<control>"),
    (98, "/"),
    (99, "<sysrq>"),
    (100, "<altgr>"),
    (102, "<home>"),
    (103, "<up>"),
    (104, "<pageup>"),
    (105, "<left>"),
    (106, "<right>"),
    (107, "<end>"),
    (108, "<down>"),
    (109, "<pagedown>"),
    (110, "<insert>"),
    (111, "<delete>"),
    (113, "<mute>"),
    (114, "<volumedown>"),
    (115, "<volumeup>"),
    (116, "<power>"),
    (117, "="),
    (119, "<pause>"),
    (121, ","),
    (125, "<meta>"),
    (126, "<meta>"),
    (127, "<compose>"),
    (183, "<f13>"),
    (184, "<f14>"),
    (185, "<f15>"),
    (186, "<f16>"),
    (187, "<f17>"),
    (188, "<f18>"),
    (189, "<f19>"),
    (190, "<f20>"),
    (191, "<f21>"),
    (192, "<f22>"),
    (193, "<f23>"),
    (194, "<f24>"),
];

const fn build_table() -> [&'static str; TABLE_SIZE] {
    let mut table = [""; TABLE_SIZE];
    let mut i = 0;

    while i < NAMES.len() {
        table[NAMES[i].0 as usize] = NAMES[i].1;
        i += 1;
    }

    table
}

static DEFAULT_TABLE: [&str; TABLE_SIZE] = build_table();

/// Maps scancodes to symbolic key names.
///
/// Empty entries mean the scancode has no name and the caller should fall back to the numeric
/// code.
#[derive(Debug, Clone, Copy)]
pub struct KeycodeTable {
    entries: &'static [&'static str; TABLE_SIZE],
}

impl Default for KeycodeTable {
    fn default() -> Self {
        Self {
            entries: &DEFAULT_TABLE,
        }
    }
}

impl KeycodeTable {
    /// Look up the symbolic name of `code`.
    ///
    /// Codes outside the table and codes without a name both return `None`.
    pub fn lookup(&self, code: u16) -> Option<&'static str> {
        self.entries
            .get(usize::from(code))
            .copied()
            .filter(|name| !name.is_empty())
    }
}
