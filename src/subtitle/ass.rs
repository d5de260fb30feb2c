use super::{Alignment, StyleSpec, SubtitleTrack, WrapMode};
use crate::error::{Result, VidError};

/// Script resolution written into every rendered document. Font sizes and
/// margins in [`StyleSpec`] are expressed against these dimensions and the
/// renderer scales them to the output frame.
pub const PLAY_RES_X: u32 = 384;
pub const PLAY_RES_Y: u32 = 288;

const STYLE_NAME: &str = "Default";

/// Columns of a `[V4+ Styles]` entry, in their serialized order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleField {
    Name,
    Fontname,
    Fontsize,
    PrimaryColour,
    SecondaryColour,
    OutlineColour,
    BackColour,
    Bold,
    Italic,
    Underline,
    StrikeOut,
    ScaleX,
    ScaleY,
    Spacing,
    Angle,
    BorderStyle,
    Outline,
    Shadow,
    Alignment,
    MarginL,
    MarginR,
    MarginV,
    Encoding,
}

impl StyleField {
    pub const ALL: [StyleField; 23] = [
        StyleField::Name,
        StyleField::Fontname,
        StyleField::Fontsize,
        StyleField::PrimaryColour,
        StyleField::SecondaryColour,
        StyleField::OutlineColour,
        StyleField::BackColour,
        StyleField::Bold,
        StyleField::Italic,
        StyleField::Underline,
        StyleField::StrikeOut,
        StyleField::ScaleX,
        StyleField::ScaleY,
        StyleField::Spacing,
        StyleField::Angle,
        StyleField::BorderStyle,
        StyleField::Outline,
        StyleField::Shadow,
        StyleField::Alignment,
        StyleField::MarginL,
        StyleField::MarginR,
        StyleField::MarginV,
        StyleField::Encoding,
    ];

    /// Column index within a style line (the name column is 0)
    pub fn position(&self) -> usize {
        *self as usize
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Name => "Name",
            Self::Fontname => "Fontname",
            Self::Fontsize => "Fontsize",
            Self::PrimaryColour => "PrimaryColour",
            Self::SecondaryColour => "SecondaryColour",
            Self::OutlineColour => "OutlineColour",
            Self::BackColour => "BackColour",
            Self::Bold => "Bold",
            Self::Italic => "Italic",
            Self::Underline => "Underline",
            Self::StrikeOut => "StrikeOut",
            Self::ScaleX => "ScaleX",
            Self::ScaleY => "ScaleY",
            Self::Spacing => "Spacing",
            Self::Angle => "Angle",
            Self::BorderStyle => "BorderStyle",
            Self::Outline => "Outline",
            Self::Shadow => "Shadow",
            Self::Alignment => "Alignment",
            Self::MarginL => "MarginL",
            Self::MarginR => "MarginR",
            Self::MarginV => "MarginV",
            Self::Encoding => "Encoding",
        }
    }

    fn default_value(&self) -> &'static str {
        match self {
            Self::Name => STYLE_NAME,
            Self::Fontname => "Arial",
            Self::PrimaryColour | Self::SecondaryColour => "&Hffffff",
            Self::OutlineColour | Self::BackColour => "&H0",
            Self::ScaleX | Self::ScaleY => "100",
            Self::BorderStyle => "1",
            Self::Alignment => "2",
            _ => "0",
        }
    }
}

/// The `Format:` line matching [`StyleField::ALL`]
pub fn style_format_line() -> String {
    let names: Vec<&str> = StyleField::ALL.iter().map(|field| field.name()).collect();
    format!("Format: {}", names.join(", "))
}

/// Render a `Style: Default,...` line
pub fn style_line(spec: &StyleSpec) -> String {
    let mut fields: Vec<String> = StyleField::ALL
        .iter()
        .map(|field| field.default_value().to_string())
        .collect();
    write_spec_fields(&mut fields, spec);

    format!("Style: {}", fields.join(","))
}

/// Patch the spec's columns of an existing style line, leaving colours,
/// emphasis and scaling untouched
pub fn rewrite_style_line(line: &str, spec: &StyleSpec) -> Option<String> {
    let body = strip_style_prefix(line)?;
    let mut fields: Vec<String> = body.split(',').map(|part| part.trim().to_string()).collect();
    if fields.len() < StyleField::ALL.len() {
        return None;
    }
    write_spec_fields(&mut fields, spec);

    Some(format!("Style: {}", fields.join(",")))
}

fn write_spec_fields(fields: &mut [String], spec: &StyleSpec) {
    let mut set = |field: StyleField, value: String| fields[field.position()] = value;

    set(StyleField::Fontname, spec.font_name.clone());
    set(StyleField::Fontsize, spec.font_size.to_string());
    set(StyleField::Outline, spec.outline.to_string());
    set(StyleField::Shadow, spec.shadow.to_string());
    set(StyleField::Alignment, spec.alignment.code().to_string());
    set(StyleField::MarginL, spec.margin_l.to_string());
    set(StyleField::MarginR, spec.margin_r.to_string());
    set(StyleField::MarginV, spec.margin_v.to_string());
}

fn strip_style_prefix(line: &str) -> Option<&str> {
    let line = line.trim();
    let (key, body) = line.split_once(':')?;
    key.trim().eq_ignore_ascii_case("style").then_some(body.trim())
}

fn is_default_style(line: &str) -> bool {
    strip_style_prefix(line)
        .and_then(|body| body.split(',').next())
        .is_some_and(|name| name.trim().eq_ignore_ascii_case(STYLE_NAME))
}

/// Replace the document's default style with `spec`, including its wrap mode
pub fn apply_style(document: &str, spec: &StyleSpec) -> Result<String> {
    let mut found = false;
    let mut lines: Vec<String> = Vec::new();

    for (number, line) in document.lines().enumerate() {
        if !found && is_default_style(line) {
            let rewritten = rewrite_style_line(line, spec).ok_or_else(|| VidError::SubtitleParse {
                block: number + 1,
                reason: format!(
                    "style line has fewer than {} fields",
                    StyleField::ALL.len()
                ),
            })?;
            lines.push(rewritten);
            found = true;
        } else {
            lines.push(line.to_string());
        }
    }

    if !found {
        return Err(VidError::SubtitleParse {
            block: 0,
            reason: format!("no '{}' style in document", STYLE_NAME),
        });
    }

    let mut patched = lines.join("\n");
    patched.push('\n');
    Ok(ensure_wrap_style(&patched, spec.wrap_mode))
}

/// Read the default style (and wrap mode) back out of a document
pub fn parse_style(document: &str) -> Result<StyleSpec> {
    let (number, line) = document
        .lines()
        .enumerate()
        .find(|(_, line)| is_default_style(line))
        .ok_or_else(|| VidError::SubtitleParse {
            block: 0,
            reason: format!("no '{}' style in document", STYLE_NAME),
        })?;

    let error = |reason: String| VidError::SubtitleParse {
        block: number + 1,
        reason,
    };

    let fields: Vec<&str> = strip_style_prefix(line)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .collect();
    if fields.len() < StyleField::ALL.len() {
        return Err(error(format!("style line has {} fields", fields.len())));
    }

    let number_at = |field: StyleField| -> Result<u32> {
        let raw = fields[field.position()];
        raw.parse::<f64>()
            .ok()
            .filter(|value| *value >= 0.0)
            .map(|value| value.round() as u32)
            .ok_or_else(|| error(format!("invalid {} '{}'", field.name(), raw)))
    };

    let alignment_code = number_at(StyleField::Alignment)?;
    let alignment = Alignment::from_code(alignment_code as u8)
        .ok_or_else(|| error(format!("unsupported alignment {}", alignment_code)))?;

    let wrap_mode = document
        .lines()
        .find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case("wrapstyle")
                .then(|| value.trim().parse::<u8>().ok())
                .flatten()
        })
        .and_then(WrapMode::from_code)
        .unwrap_or(WrapMode::Smart);

    Ok(StyleSpec {
        font_name: fields[StyleField::Fontname.position()].to_string(),
        font_size: number_at(StyleField::Fontsize)?,
        outline: number_at(StyleField::Outline)?,
        shadow: number_at(StyleField::Shadow)?,
        margin_l: number_at(StyleField::MarginL)?,
        margin_r: number_at(StyleField::MarginR)?,
        margin_v: number_at(StyleField::MarginV)?,
        alignment,
        wrap_mode,
    })
}

/// Replace `WrapStyle:` or insert it after the `[Script Info]` comments
pub fn ensure_wrap_style(document: &str, mode: WrapMode) -> String {
    let entry = format!("WrapStyle: {}", mode.code());
    let mut lines: Vec<String> = document.lines().map(str::to_string).collect();

    if let Some(existing) = lines
        .iter_mut()
        .find(|line| line.trim().to_lowercase().starts_with("wrapstyle:"))
    {
        *existing = entry;
    } else if let Some(header) = lines
        .iter()
        .position(|line| line.trim().eq_ignore_ascii_case("[script info]"))
    {
        let mut insert_at = header + 1;
        while insert_at < lines.len() && lines[insert_at].trim().starts_with(';') {
            insert_at += 1;
        }
        lines.insert(insert_at, entry);
    }

    let mut output = lines.join("\n");
    output.push('\n');
    output
}

/// Render a complete document with one dialogue event per cue
pub fn render_document(track: &SubtitleTrack, spec: &StyleSpec) -> String {
    let mut document = String::new();

    document.push_str("[Script Info]\n");
    document.push_str("; Script generated by vidscaler\n");
    document.push_str("ScriptType: v4.00+\n");
    document.push_str(&format!("PlayResX: {}\n", PLAY_RES_X));
    document.push_str(&format!("PlayResY: {}\n", PLAY_RES_Y));
    document.push_str(&format!("WrapStyle: {}\n", spec.wrap_mode.code()));
    document.push_str("ScaledBorderAndShadow: yes\n\n");

    document.push_str("[V4+ Styles]\n");
    document.push_str(&style_format_line());
    document.push('\n');
    document.push_str(&style_line(spec));
    document.push_str("\n\n");

    document.push_str("[Events]\n");
    document.push_str("Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text\n");
    for cue in track {
        document.push_str(&format!(
            "Dialogue: 0,{},{},{},,0,0,0,,{}\n",
            cue.start.to_ass(),
            cue.end.to_ass(),
            STYLE_NAME,
            escape_text(&cue.text)
        ));
    }

    document
}

fn escape_text(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\n', "\\N")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subtitle::SubtitleCue;
    use crate::timeline::Timestamp;

    const FFMPEG_STYLE: &str =
        "Style: Default,Arial,16,&Hffffff,&Hffffff,&H0,&H0,0,0,0,0,100,100,0,0,1,1,0,2,10,10,10,0";

    fn dual_top() -> StyleSpec {
        StyleSpec {
            font_size: 15,
            margin_l: 2,
            margin_r: 2,
            margin_v: 10,
            alignment: Alignment::TopCenter,
            ..StyleSpec::default()
        }
    }

    #[test]
    fn test_schema_positions() {
        assert_eq!(StyleField::ALL.len(), 23);
        for (index, field) in StyleField::ALL.iter().enumerate() {
            assert_eq!(field.position(), index);
        }
        assert_eq!(StyleField::Fontsize.position(), 2);
        assert_eq!(StyleField::Outline.position(), 16);
        assert_eq!(StyleField::Alignment.position(), 18);
        assert_eq!(StyleField::MarginV.position(), 21);
    }

    #[test]
    fn test_style_line_field_positions() {
        let line = style_line(&dual_top());
        let parts: Vec<&str> = line.split(',').collect();

        assert_eq!(parts.len(), 23);
        assert_eq!(parts[0], "Style: Default");
        assert_eq!(parts[2], "15");
        assert_eq!(parts[16], "2");
        assert_eq!(parts[17], "0");
        assert_eq!(parts[18], "8");
        assert_eq!(parts[19], "2");
        assert_eq!(parts[20], "2");
        assert_eq!(parts[21], "10");
    }

    #[test]
    fn test_rewrite_keeps_unrelated_columns() {
        let rewritten = rewrite_style_line(FFMPEG_STYLE, &dual_top()).unwrap();
        assert_eq!(
            rewritten,
            "Style: Default,Arial,15,&Hffffff,&Hffffff,&H0,&H0,0,0,0,0,100,100,0,0,1,2,0,8,2,2,10,0"
        );
        assert!(rewrite_style_line("Style: Default,Arial,16", &dual_top()).is_none());
        assert!(rewrite_style_line("Dialogue: 0,0:00:00.00", &dual_top()).is_none());
    }

    #[test]
    fn test_apply_style_to_converted_document() {
        let document = format!(
            "[Script Info]\n; Script generated by FFmpeg/Lavc\nScriptType: v4.00+\n\n[V4+ Styles]\n{}\n{}\n",
            style_format_line(),
            FFMPEG_STYLE
        );
        let patched = apply_style(&document, &dual_top()).unwrap();

        assert!(patched.contains("; Script generated by FFmpeg/Lavc\nWrapStyle: 3\nScriptType"));
        assert_eq!(parse_style(&patched).unwrap(), dual_top());
    }

    #[test]
    fn test_apply_style_requires_default_style() {
        let err = apply_style("[Script Info]\n", &dual_top()).unwrap_err();
        assert!(matches!(err, VidError::SubtitleParse { .. }));
    }

    #[test]
    fn test_ensure_wrap_style_replaces_existing() {
        let document = "[Script Info]\nWrapStyle: 0\nPlayResX: 384\n";
        let patched = ensure_wrap_style(document, WrapMode::EndOfLine);

        assert_eq!(patched, "[Script Info]\nWrapStyle: 1\nPlayResX: 384\n");
    }

    #[test]
    fn test_rendered_document_round_trips_style() {
        let track = SubtitleTrack::new(vec![SubtitleCue::new(
            1,
            Timestamp::from_millis(0),
            Timestamp::from_millis(6_080),
            "Does nature\nspeak to us?",
        )]);
        let document = render_document(&track, &dual_top());

        assert!(document.contains("PlayResY: 288\n"));
        assert!(document.contains("Dialogue: 0,0:00:00.00,0:00:06.08,Default,,0,0,0,,Does nature\\Nspeak to us?\n"));
        assert_eq!(parse_style(&document).unwrap(), dual_top());
    }
}
