//! PDF export of a rendered infraction record.
//!
//! Layout happens in two passes: `paginate` flows the view's lines and
//! signature images onto as many A4 pages as needed, then `write` serializes
//! the pages with pdf-writer. Text uses the standard Helvetica fonts in
//! WinAnsi encoding, which covers every accented Portuguese letter.

use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str};
use tiny_skia::Pixmap;
use tracing::debug;

use crate::domain::InfractionId;
use crate::viewer::{RecordView, OBSERVATIONS_HEADING};

/// A4 width in points
pub const PAGE_WIDTH: f32 = 595.28;
/// A4 height in points
pub const PAGE_HEIGHT: f32 = 841.89;
/// Margin on every side, in points
pub const MARGIN: f32 = 40.0;

const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const CONTENT_HEIGHT: f32 = PAGE_HEIGHT - 2.0 * MARGIN;

const TITLE_SIZE: f32 = 16.0;
const BODY_SIZE: f32 = 11.0;
const LINE_SPACING: f32 = 1.4;
const BLOCK_GAP: f32 = 8.0;

/// Widest Helvetica glyph average we plan for, as a fraction of the font size
const AVG_GLYPH_WIDTH: f32 = 0.55;

const FONT_REGULAR: Name<'static> = Name(b"F1");
const FONT_BOLD: Name<'static> = Name(b"F2");

/// Errors raised while exporting
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("signature image could not be decoded: {0}")]
    Image(String),
}

/// Name of the downloaded file for a record
pub fn download_filename(id: InfractionId) -> String {
    format!("auto_infracao_{}.pdf", id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn name(self) -> Name<'static> {
        match self {
            Font::Regular => FONT_REGULAR,
            Font::Bold => FONT_BOLD,
        }
    }
}

/// An RGB raster ready to embed as an image XObject
#[derive(Debug, Clone)]
struct RgbImage {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RgbImage {
    /// Decode a PNG and composite it over white.
    fn from_png(png: &[u8]) -> Result<Self, ExportError> {
        let pixmap = Pixmap::decode_png(png).map_err(|e| ExportError::Image(e.to_string()))?;

        let mut data = Vec::with_capacity(pixmap.pixels().len() * 3);
        for pixel in pixmap.pixels() {
            // premultiplied: c + (1 - a) * white
            let blank = 255 - pixel.alpha();
            data.push(pixel.red().saturating_add(blank));
            data.push(pixel.green().saturating_add(blank));
            data.push(pixel.blue().saturating_add(blank));
        }

        Ok(Self {
            width: pixmap.width(),
            height: pixmap.height(),
            data,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Text {
        font: Font,
        size: f32,
        x: f32,
        y: f32,
        text: Vec<u8>,
    },
    Image {
        index: usize,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
    },
}

#[derive(Debug, Default, Clone, PartialEq)]
struct PageLayout {
    ops: Vec<Op>,
}

impl PageLayout {
    fn images(&self) -> impl Iterator<Item = usize> + '_ {
        self.ops.iter().filter_map(|op| match op {
            Op::Image { index, .. } => Some(*index),
            Op::Text { .. } => None,
        })
    }
}

/// Flows content top to bottom, breaking onto a new page when it runs out.
struct Flow {
    pages: Vec<PageLayout>,
    current: PageLayout,
    /// Baseline cursor measured from the bottom of the page
    y: f32,
}

impl Flow {
    fn new() -> Self {
        Self {
            pages: Vec::new(),
            current: PageLayout::default(),
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn break_page(&mut self) {
        let page = std::mem::take(&mut self.current);
        self.pages.push(page);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn ensure(&mut self, height: f32) {
        if self.y - height < MARGIN && !self.current.ops.is_empty() {
            self.break_page();
        }
    }

    fn text(&mut self, font: Font, size: f32, text: &str) {
        let line_height = size * LINE_SPACING;
        for line in wrap(text, size) {
            self.ensure(line_height);
            self.y -= line_height;
            self.current.ops.push(Op::Text {
                font,
                size,
                x: MARGIN,
                y: self.y,
                text: encode_win_ansi(&line),
            });
        }
    }

    fn gap(&mut self, height: f32) {
        self.y -= height;
    }

    fn image(&mut self, index: usize, image: &RgbImage) {
        let (width, height) = fit(image.width as f32, image.height as f32);
        self.ensure(height);
        self.y -= height;
        self.current.ops.push(Op::Image {
            index,
            x: MARGIN,
            y: self.y,
            width,
            height,
        });
    }

    fn finish(mut self) -> Vec<PageLayout> {
        if !self.current.ops.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

/// Scale to the content width, shrinking further if taller than a page.
fn fit(width: f32, height: f32) -> (f32, f32) {
    if width <= 0.0 || height <= 0.0 {
        return (0.0, 0.0);
    }
    let mut scale = CONTENT_WIDTH / width;
    if height * scale > CONTENT_HEIGHT / 2.0 {
        scale = CONTENT_HEIGHT / 2.0 / height;
    }
    (width * scale, height * scale)
}

/// Break `text` into lines that fit the content width at `size`.
fn wrap(text: &str, size: f32) -> Vec<String> {
    let max_chars = ((CONTENT_WIDTH / (size * AVG_GLYPH_WIDTH)) as usize).max(1);
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > max_chars {
                if !line.is_empty() {
                    lines.push(std::mem::take(&mut line));
                }
                let rest = word.split_off(max_chars);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let line_len = line.chars().count();
            let needed = if line.is_empty() { word.len() } else { line_len + 1 + word.len() };
            if needed > max_chars && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.extend(word);
        }
        lines.push(line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Encode as WinAnsi: Latin-1, plus the CP1252 punctuation block at 0x80..0x9F.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c as u32 {
            0x20..=0x7E | 0xA0..=0xFF => c as u32 as u8,
            _ => win_ansi_extra(c).unwrap_or(b'?'),
        })
        .collect()
}

fn win_ansi_extra(c: char) -> Option<u8> {
    let byte = match c {
        '\u{20AC}' => 0x80,
        '\u{201A}' => 0x82,
        '\u{0192}' => 0x83,
        '\u{201E}' => 0x84,
        '\u{2026}' => 0x85,
        '\u{2020}' => 0x86,
        '\u{2021}' => 0x87,
        '\u{02C6}' => 0x88,
        '\u{2030}' => 0x89,
        '\u{0160}' => 0x8A,
        '\u{2039}' => 0x8B,
        '\u{0152}' => 0x8C,
        '\u{017D}' => 0x8E,
        '\u{2018}' => 0x91,
        '\u{2019}' => 0x92,
        '\u{201C}' => 0x93,
        '\u{201D}' => 0x94,
        '\u{2022}' => 0x95,
        '\u{2013}' => 0x96,
        '\u{2014}' => 0x97,
        '\u{02DC}' => 0x98,
        '\u{2122}' => 0x99,
        '\u{0161}' => 0x9A,
        '\u{203A}' => 0x9B,
        '\u{0153}' => 0x9C,
        '\u{017E}' => 0x9E,
        '\u{0178}' => 0x9F,
        _ => return None,
    };
    Some(byte)
}

/// Renders `RecordView`s as PDF documents
#[derive(Debug, Default, Clone)]
pub struct PdfExporter;

impl PdfExporter {
    pub fn new() -> Self {
        Self
    }

    pub fn export(&self, view: &RecordView) -> Result<Vec<u8>, ExportError> {
        let images = view
            .signatures
            .iter()
            .map(|s| RgbImage::from_png(s.image.png_bytes()))
            .collect::<Result<Vec<_>, _>>()?;

        let pages = self.paginate(view, &images);
        debug!(id = %view.id, pages = pages.len(), "exporting infraction to PDF");
        Ok(write(&pages, &images))
    }

    fn paginate(&self, view: &RecordView, images: &[RgbImage]) -> Vec<PageLayout> {
        let mut flow = Flow::new();

        flow.text(Font::Bold, TITLE_SIZE, &view.title);
        flow.gap(BLOCK_GAP);

        for line in &view.lines {
            flow.text(Font::Regular, BODY_SIZE, &line.text());
        }

        flow.gap(BLOCK_GAP);
        flow.text(Font::Bold, BODY_SIZE, OBSERVATIONS_HEADING);
        for paragraph in &view.observations {
            flow.text(Font::Regular, BODY_SIZE, paragraph);
        }

        if !view.witnesses.is_empty() {
            flow.gap(BLOCK_GAP);
            flow.text(Font::Bold, BODY_SIZE, "Testemunhas");
            for witness in &view.witnesses {
                flow.text(Font::Regular, BODY_SIZE, &witness.text());
            }
        }

        for (index, (signature, image)) in view.signatures.iter().zip(images).enumerate() {
            flow.gap(BLOCK_GAP);
            // keep the caption on the same page as its image
            let (_, height) = fit(image.width as f32, image.height as f32);
            flow.ensure(BODY_SIZE * LINE_SPACING + height);
            flow.text(Font::Bold, BODY_SIZE, signature.label);
            flow.image(index, image);
        }

        flow.finish()
    }
}

fn image_name(index: usize) -> String {
    format!("Im{}", index + 1)
}

fn write(pages: &[PageLayout], images: &[RgbImage]) -> Vec<u8> {
    let mut next = 1;
    let mut alloc = || {
        let r = Ref::new(next);
        next += 1;
        r
    };

    let catalog_id = alloc();
    let page_tree_id = alloc();
    let regular_id = alloc();
    let bold_id = alloc();
    let image_ids: Vec<Ref> = images.iter().map(|_| alloc()).collect();
    let page_ids: Vec<(Ref, Ref)> = pages.iter().map(|_| (alloc(), alloc())).collect();

    let mut pdf = Pdf::new();
    pdf.catalog(catalog_id).pages(page_tree_id);
    pdf.pages(page_tree_id)
        .kids(page_ids.iter().map(|(page, _)| *page))
        .count(pages.len() as i32);

    pdf.type1_font(regular_id)
        .base_font(Name(b"Helvetica"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));
    pdf.type1_font(bold_id)
        .base_font(Name(b"Helvetica-Bold"))
        .encoding_predefined(Name(b"WinAnsiEncoding"));

    for (image, id) in images.iter().zip(&image_ids) {
        let mut xobject = pdf.image_xobject(*id, &image.data);
        xobject.width(image.width as i32);
        xobject.height(image.height as i32);
        xobject.color_space().device_rgb();
        xobject.bits_per_component(8);
        xobject.finish();
    }

    for (layout, (page_id, content_id)) in pages.iter().zip(&page_ids) {
        let mut page = pdf.page(*page_id);
        page.media_box(Rect::new(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT));
        page.parent(page_tree_id);
        page.contents(*content_id);

        let mut resources = page.resources();
        resources
            .fonts()
            .pair(FONT_REGULAR, regular_id)
            .pair(FONT_BOLD, bold_id);
        let names: Vec<(String, Ref)> = layout
            .images()
            .map(|index| (image_name(index), image_ids[index]))
            .collect();
        if !names.is_empty() {
            let mut x_objects = resources.x_objects();
            for (name, id) in &names {
                x_objects.pair(Name(name.as_bytes()), *id);
            }
            x_objects.finish();
        }
        resources.finish();
        page.finish();

        pdf.stream(*content_id, &render(layout));
    }

    pdf.finish()
}

fn render(layout: &PageLayout) -> Vec<u8> {
    let mut content = Content::new();
    for op in &layout.ops {
        match op {
            Op::Text { font, size, x, y, text } => {
                content.begin_text();
                content.set_font(font.name(), *size);
                content.next_line(*x, *y);
                content.show(Str(text));
                content.end_text();
            }
            Op::Image { index, x, y, width, height } => {
                let name = image_name(*index);
                content.save_state();
                content.transform([*width, 0.0, 0.0, *height, *x, *y]);
                content.x_object(Name(name.as_bytes()));
                content.restore_state();
            }
        }
    }
    content.finish()
}
