// Phase 8: 画像XObject構築、SMask参照、コンテンツストリーム組立

use std::path::Path;

use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use super::layout::Frame;
use crate::error::LayerError;
use crate::layers::codec::EncodedImage;
use crate::layers::policy::Codec;

/// Page-composition collaborator: builds one output document page by page.
///
/// Images are painted in call order, so background layers must be added
/// before the foreground layers that cover them.
pub trait PageComposer {
    /// Start a new page of `width` x `height` points.
    fn add_page(&mut self, width: f64, height: f64, rotate: i64) -> crate::error::Result<()>;

    /// Place `image` on the current page, optionally with a soft mask.
    ///
    /// `theta` rotates the image counter-clockwise (degrees) about the
    /// bottom-left corner of its frame.
    fn add_image(
        &mut self,
        image: &EncodedImage,
        frame: &Frame,
        theta: f64,
        mask: Option<&EncodedImage>,
    ) -> crate::error::Result<()>;

    fn page_count(&self) -> usize;
}

struct PageState {
    width: f64,
    height: f64,
    rotate: i64,
    xobjects: Vec<(String, ObjectId)>,
    content: String,
}

/// `lopdf` による [`PageComposer`] 実装。
pub struct PdfComposer {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
    current: Option<PageState>,
}

impl Default for PdfComposer {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfComposer {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
            current: None,
        }
    }

    /// 画像XObjectを追加する。
    ///
    /// 戻り値はXObjectのオブジェクトID。
    pub fn add_image_xobject(&mut self, image: &EncodedImage, smask: Option<ObjectId>) -> ObjectId {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width as i64,
            "Height" => image.height as i64,
            "ColorSpace" => image.color_space,
            "BitsPerComponent" => image.bits_per_component() as i64,
            "Filter" => image.codec.filter_name(),
        };
        if let Codec::CcittG4 { columns } = image.codec {
            dict.set(
                "DecodeParms",
                dictionary! {
                    "K" => -1,
                    "Columns" => columns as i64,
                    "Rows" => image.height as i64,
                    "BlackIs1" => false,
                },
            );
        }
        if let Some(mask_id) = smask {
            dict.set("SMask", Object::Reference(mask_id));
        }
        let stream = Stream::new(dict, image.data.clone());
        self.doc.add_object(Object::Stream(stream))
    }

    /// 画像1枚分の描画コマンドを生成する:
    /// `q a b c d e f cm /Name Do Q`
    ///
    /// `frame` uses a top-left origin; PDF user space starts bottom-left, so
    /// the frame is flipped against `page_height`.
    pub fn build_image_op(name: &str, frame: &Frame, page_height: f64, theta: f64) -> String {
        let llx = frame.x;
        let lly = page_height - frame.y - frame.height;
        let (sin, cos) = theta.to_radians().sin_cos();
        format!(
            "q {} {} {} {} {} {} cm /{} Do Q\n",
            fmt_num(frame.width * cos),
            fmt_num(frame.width * sin),
            fmt_num(-frame.height * sin),
            fmt_num(frame.height * cos),
            fmt_num(llx),
            fmt_num(lly),
            escape_name(name),
        )
    }

    fn flush_page(&mut self) {
        let Some(page) = self.current.take() else {
            return;
        };

        let mut xobject_dict = lopdf::Dictionary::new();
        for (name, id) in &page.xobjects {
            xobject_dict.set(name.as_bytes().to_vec(), Object::Reference(*id));
        }
        let resources_id = self.doc.add_object(dictionary! {
            "XObject" => Object::Dictionary(xobject_dict),
        });

        let content_stream = Stream::new(dictionary! {}, page.content.into_bytes());
        let content_id = self.doc.add_object(Object::Stream(content_stream));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(page.width as f32),
                Object::Real(page.height as f32),
            ],
            "Rotate" => page.rotate,
            "Resources" => resources_id,
            "Contents" => content_id,
        });
        self.page_ids.push(page_id);
    }

    fn finalize(&mut self) {
        self.flush_page();

        let kids: Vec<Object> = self.page_ids.iter().map(|&id| id.into()).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);
    }

    /// PDFドキュメントをバイト列として出力する。
    pub fn save_to_bytes(mut self) -> crate::error::Result<Vec<u8>> {
        self.finalize();
        let mut buf = Vec::new();
        self.doc
            .save_to(&mut buf)
            .map_err(|e| LayerError::io_failure(format!("PDF write error: {e}")))?;
        Ok(buf)
    }

    /// PDFドキュメントをファイルに書き出す。
    pub fn save(self, path: &Path) -> crate::error::Result<()> {
        let bytes = self.save_to_bytes()?;
        std::fs::write(path, bytes)
            .map_err(|e| LayerError::io_failure(format!("cannot write {}: {e}", path.display())))
    }
}

impl PageComposer for PdfComposer {
    fn add_page(&mut self, width: f64, height: f64, rotate: i64) -> crate::error::Result<()> {
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(LayerError::geometry(format!(
                "page size must be positive, got {width}x{height}"
            )));
        }
        self.flush_page();
        self.current = Some(PageState {
            width,
            height,
            rotate,
            xobjects: Vec::new(),
            content: String::new(),
        });
        Ok(())
    }

    fn add_image(
        &mut self,
        image: &EncodedImage,
        frame: &Frame,
        theta: f64,
        mask: Option<&EncodedImage>,
    ) -> crate::error::Result<()> {
        if self.current.is_none() {
            return Err(LayerError::io_failure("add_image called before add_page"));
        }
        if let Some(m) = mask
            && m.color_space != "DeviceGray"
        {
            return Err(LayerError::unsupported_encoding(format!(
                "soft mask must be DeviceGray, got {}",
                m.color_space
            )));
        }

        let mask_id = mask.map(|m| self.add_image_xobject(m, None));
        let image_id = self.add_image_xobject(image, mask_id);

        let Some(page) = self.current.as_mut() else {
            return Err(LayerError::io_failure("add_image called before add_page"));
        };
        let name = format!("Im{}", page.xobjects.len());
        page.content
            .push_str(&Self::build_image_op(&name, frame, page.height, theta));
        page.xobjects.push((name, image_id));
        Ok(())
    }

    fn page_count(&self) -> usize {
        self.page_ids.len() + usize::from(self.current.is_some())
    }
}

/// Decimal with at most 4 fractional digits and no trailing zeros.
fn fmt_num(v: f64) -> String {
    let s = format!("{v:.4}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" || s.is_empty() {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// PDF Name のエスケープ（区切り文字・空白・非表示文字を `#xx` に）。
fn escape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for b in name.bytes() {
        let delimiter = matches!(
            b,
            b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' | b'#'
        );
        if !(0x21..=0x7E).contains(&b) || delimiter {
            out.push_str(&format!("#{b:02X}"));
        } else {
            out.push(b as char);
        }
    }
    out
}
