//! SDK level to Android platform-name lookup.

// Level names per https://apilevels.com/
static LEVELS: &[(&str, &str)] = &[
    ("36", "Android 16"),
    ("35", "Android 15"),
    ("34", "Android 14"),
    ("33", "Android 13"),
    ("32", "Android 12.0L"),
    ("31", "Android 12"),
    ("30", "Android 11"),
    ("29", "Android 10"),
    ("28", "Android 9 (Pie)"),
    ("27", "Android 8.1 (Oreo)"),
    ("26", "Android 8.0 (Oreo)"),
    ("25", "Android 7.1 (Nougat)"),
    ("24", "Android 7.0 (Nougat)"),
    ("23", "Android 6 (Marshmallow)"),
    ("22", "Android 5.1 (Lollipop)"),
    ("21", "Android 5.0 (Lollipop)"),
    ("20", "Android 4.4W (KitKat Watch)"),
    ("19", "Android 4.4 (KitKat)"),
    ("18", "Android 4.3 (Jelly Bean)"),
    ("17", "Android 4.2 (Jelly Bean)"),
    ("16", "Android 4.1 (Jelly Bean)"),
    ("15", "Android 4.0.3 (Ice Cream Sandwich)"),
    ("14", "Android 4.0 (Ice Cream Sandwich)"),
    ("13", "Android 3.2 (Honeycomb)"),
    ("12", "Android 3.1 (Honeycomb)"),
    ("11", "Android 3.0 (Honeycomb)"),
    ("10", "Android 2.3.3 Gingerbread"),
    ("9", "Android 2.3 (Gingerbread)"),
    ("8", "Android 2.2 (Froyo)"),
    ("7", "Android 2.1 (Eclair)"),
    ("6", "Android 2.0.1 (Eclair)"),
    ("5", "Android 2.0 (Eclair)"),
    ("4", "Android 1.6 (Donut)"),
    ("3", "Android 1.5 (Cupcake)"),
    ("2", "Android 1.1 (Base 1.1)"),
    ("1", "Android 1.0 (Base)"),
];

/// Map a numeric SDK level to `"<level>: <platform name>"`.
///
/// Unknown levels pass through unchanged rather than failing, so output
/// from future platform versions stays usable.
pub fn sdk_to_android_version(sdk: &str) -> String {
    LEVELS
        .iter()
        .find(|(level, _)| *level == sdk)
        .map_or_else(|| sdk.to_string(), |(level, name)| format!("{level}: {name}"))
}
