//! Printable documents: A4 invoice and quotation, 100×150 mm shipping label.
//!
//! Pages are drawn with the standard Helvetica faces, so no font files are
//! embedded. Coordinates are PDF points from the bottom-left corner.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use invctl_core::{format_rupiah, ServiceError};
use stock::model::{Sku, Store};

use crate::model::{Payment, Quotation, SalesOrder};

const MM: f32 = 72.0 / 25.4;
const A4: (f32, f32) = (595.28, 841.89);
const LABEL: (f32, f32) = (100.0 * MM, 150.0 * MM);
const MARGIN: f32 = 50.0;

const REGULAR: &str = "F1";
const BOLD: &str = "F2";

/// Everything an invoice shows.
pub struct InvoiceData<'a> {
    pub order: &'a SalesOrder,
    pub sku: &'a Sku,
    pub payments: &'a [Payment],
    pub store: Option<&'a Store>,
    pub sales_person: &'a str,
}

pub struct QuotationData<'a> {
    pub quotation: &'a Quotation,
    pub sku: &'a Sku,
    pub store: Option<&'a Store>,
    pub sales_person: &'a str,
}

pub struct LabelData<'a> {
    pub order: &'a SalesOrder,
    pub sku: &'a Sku,
    pub store: Option<&'a Store>,
}

/// A single page being drawn.
struct Page {
    width: f32,
    height: f32,
    ops: Vec<Operation>,
}

impl Page {
    fn new((width, height): (f32, f32)) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    fn text(&mut self, x: f32, y: f32, size: f32, font: &str, text: &str) {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
        self.ops.push(Operation::new("Td", vec![x.into(), y.into()]));
        self.ops.push(Operation::new("Tj", vec![Object::string_literal(latin1(text))]));
        self.ops.push(Operation::new("ET", vec![]));
    }

    /// Text ending at `right`.
    fn text_right(&mut self, right: f32, y: f32, size: f32, font: &str, text: &str) {
        self.text(right - text_width(text, size), y, size, font, text);
    }

    fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32) {
        self.ops.push(Operation::new("w", vec![width.into()]));
        self.ops.push(Operation::new("m", vec![x1.into(), y1.into()]));
        self.ops.push(Operation::new("l", vec![x2.into(), y2.into()]));
        self.ops.push(Operation::new("S", vec![]));
    }

    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, width: f32) {
        self.ops.push(Operation::new("w", vec![width.into()]));
        self.ops.push(Operation::new("re", vec![x.into(), y.into(), w.into(), h.into()]));
        self.ops.push(Operation::new("S", vec![]));
    }

    /// Wrapped paragraph; returns the baseline below the last line.
    fn paragraph(&mut self, x: f32, mut y: f32, size: f32, max_chars: usize, text: &str) -> f32 {
        for line in wrap(text, max_chars) {
            self.text(x, y, size, REGULAR, &line);
            y -= size * 1.35;
        }
        y
    }

    fn finish(self) -> Result<Vec<u8>, ServiceError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let regular = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let bold = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica-Bold",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources = doc.add_object(dictionary! {
            "Font" => dictionary! {
                REGULAR => regular,
                BOLD => bold,
            },
        });
        let content = Content { operations: self.ops }
            .encode()
            .map_err(pdf_error)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let media_box: Vec<Object> = vec![0.into(), 0.into(), self.width.into(), self.height.into()];
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => media_box,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![Object::from(page_id)],
                "Count" => 1,
                "Resources" => resources,
            }),
        );
        let catalog = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog);

        let mut out = Vec::new();
        doc.save_to(&mut out).map_err(pdf_error)?;
        Ok(out)
    }
}

fn pdf_error(e: impl std::fmt::Display) -> ServiceError {
    ServiceError::Internal(format!("pdf rendering failed: {}", e))
}

/// WinAnsi covers Latin-1; anything else prints as `?`.
fn latin1(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect()
}

/// Helvetica averages a little over half an em per glyph.
fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * 0.52
}

/// Greedy word wrap that also honours explicit line breaks.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    for raw in text.lines() {
        let mut line = String::new();
        for word in raw.split_whitespace() {
            if !line.is_empty() && line.chars().count() + 1 + word.chars().count() > max_chars {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

/// `2026-10-16T08:00:00.000000Z` → `16/10/2026`.
fn display_date(ts: &str) -> String {
    match (ts.get(0..4), ts.get(5..7), ts.get(8..10)) {
        (Some(y), Some(m), Some(d)) => format!("{}/{}/{}", d, m, y),
        _ => ts.to_string(),
    }
}

/// Invoice numbers are derived from the order: `INV-20261016-1A2B3C`.
pub fn invoice_number(order: &SalesOrder) -> String {
    let day: String = order.created_at.chars().filter(char::is_ascii_digit).take(8).collect();
    let tail: String = order.id.chars().take(6).collect();
    format!("INV-{}-{}", day, tail.to_uppercase())
}

/// Store letterhead at the top of an A4 page; returns the next baseline.
fn letterhead(page: &mut Page, title: &str, store: Option<&Store>) -> f32 {
    let top = page.height - MARGIN;
    let right = page.width - MARGIN;
    let name = store.map(|s| s.name.as_str()).unwrap_or("Warehouse");
    page.text(MARGIN, top, 16.0, BOLD, name);
    let mut y = top - 16.0;
    if let Some(store) = store {
        if let Some(address) = &store.address {
            y = page.paragraph(MARGIN, y, 9.0, 60, address);
        }
        if let Some(phone) = &store.phone {
            page.text(MARGIN, y, 9.0, REGULAR, &format!("Tel. {}", phone));
            y -= 12.0;
        }
    }
    page.text_right(right, top, 20.0, BOLD, title);
    y -= 8.0;
    page.line(MARGIN, y, right, y, 1.0);
    y - 22.0
}

/// Customer block; returns the next baseline.
fn bill_to(page: &mut Page, y: f32, heading: &str, name: &str, address: &str, phone: &str) -> f32 {
    page.text(MARGIN, y, 9.0, BOLD, heading);
    page.text(MARGIN, y - 14.0, 11.0, BOLD, name);
    let y = page.paragraph(MARGIN, y - 28.0, 9.0, 55, address);
    page.text(MARGIN, y, 9.0, REGULAR, phone);
    y - 24.0
}

/// Column x positions for the item table.
struct Columns {
    item: f32,
    qty: f32,
    price: f32,
    total: f32,
}

impl Columns {
    fn for_page(page: &Page) -> Self {
        let right = page.width - MARGIN;
        Self {
            item: MARGIN,
            qty: right - 230.0,
            price: right - 110.0,
            total: right,
        }
    }
}

fn item_table(page: &mut Page, y: f32, sku: &Sku, qty: i64, unit_price: i64) -> f32 {
    let c = Columns::for_page(page);
    page.line(MARGIN, y + 12.0, c.total, y + 12.0, 0.5);
    page.text(c.item, y, 9.0, BOLD, "Item");
    page.text_right(c.qty, y, 9.0, BOLD, "Qty");
    page.text_right(c.price, y, 9.0, BOLD, "Unit price");
    page.text_right(c.total, y, 9.0, BOLD, "Amount");
    page.line(MARGIN, y - 6.0, c.total, y - 6.0, 0.5);

    let y = y - 22.0;
    page.text(c.item, y, 10.0, REGULAR, &sku.name);
    page.text(c.item, y - 12.0, 8.0, REGULAR, &format!("SKU {}", sku.sku_code));
    page.text_right(c.qty, y, 10.0, REGULAR, &qty.to_string());
    page.text_right(c.price, y, 10.0, REGULAR, &format_rupiah(unit_price));
    page.text_right(c.total, y, 10.0, REGULAR, &format_rupiah(qty * unit_price));
    let y = y - 24.0;
    page.line(MARGIN, y, c.total, y, 0.5);
    y - 18.0
}

/// Right-aligned `label  amount` row.
fn total_row(page: &mut Page, y: f32, label: &str, amount: i64, bold: bool) -> f32 {
    let c = Columns::for_page(page);
    let font = if bold { BOLD } else { REGULAR };
    page.text_right(c.price, y, 10.0, font, label);
    page.text_right(c.total, y, 10.0, font, &format_rupiah(amount));
    y - 16.0
}

pub fn render_invoice(data: &InvoiceData<'_>) -> Result<Vec<u8>, ServiceError> {
    let order = data.order;
    let mut page = Page::new(A4);
    let right = page.width - MARGIN;
    let mut y = letterhead(&mut page, "INVOICE", data.store);

    page.text_right(right, y, 10.0, BOLD, &invoice_number(order));
    page.text_right(right, y - 14.0, 9.0, REGULAR, &format!("Date {}", display_date(&order.created_at)));
    page.text_right(right, y - 28.0, 9.0, REGULAR, &format!("Status {}", order.status));
    page.text_right(right, y - 42.0, 9.0, REGULAR, &format!("Sales {}", data.sales_person));
    y = bill_to(
        &mut page,
        y,
        "BILL TO",
        &order.customer_name,
        &order.customer_address,
        &order.customer_phone,
    );
    y = y.min(page.height - 230.0);

    y = item_table(&mut page, y, data.sku, 1, order.price);
    let paid: i64 = data.payments.iter().map(|p| p.amount).sum();
    y = total_row(&mut page, y, "Total", order.price, true);
    y = total_row(&mut page, y, "Paid", paid, false);
    y = total_row(&mut page, y, "Balance due", order.price - paid, true);

    if !data.payments.is_empty() {
        y -= 14.0;
        page.text(MARGIN, y, 10.0, BOLD, "Payments");
        y -= 16.0;
        for (i, p) in data.payments.iter().enumerate() {
            page.text(MARGIN, y, 9.0, REGULAR, &format!("{}. {}", i + 1, display_date(&p.payment_date)));
            page.text_right(MARGIN + 220.0, y, 9.0, REGULAR, &format_rupiah(p.amount));
            y -= 13.0;
        }
    }
    if let Some(courier) = &order.shipping_type {
        y -= 10.0;
        page.text(MARGIN, y, 9.0, REGULAR, &format!("Shipping: {}", courier));
    }
    page.text(MARGIN, MARGIN, 8.0, REGULAR, "Thank you for your purchase.");
    page.finish()
}

pub fn render_quotation(data: &QuotationData<'_>) -> Result<Vec<u8>, ServiceError> {
    let q = data.quotation;
    let mut page = Page::new(A4);
    let right = page.width - MARGIN;
    let mut y = letterhead(&mut page, "QUOTATION", data.store);

    page.text_right(right, y, 10.0, BOLD, &q.quotation_number);
    page.text_right(right, y - 14.0, 9.0, REGULAR, &format!("Date {}", display_date(&q.created_at)));
    page.text_right(right, y - 28.0, 9.0, REGULAR, &format!("Valid until {}", display_date(&q.valid_until)));
    page.text_right(right, y - 42.0, 9.0, REGULAR, &format!("Sales {}", data.sales_person));
    y = bill_to(&mut page, y, "TO", &q.customer_name, &q.customer_address, &q.customer_phone);
    y = y.min(page.height - 230.0);

    let (subtotal, total) = q.amounts()?;
    y = item_table(&mut page, y, data.sku, q.quantity, q.price);
    y = total_row(&mut page, y, "Subtotal", subtotal, false);
    if q.extra_discount > 0 {
        y = total_row(&mut page, y, "Discount", -q.extra_discount, false);
    }
    y = total_row(&mut page, y, "Total", total, true);

    if let Some(notes) = &q.notes {
        y -= 14.0;
        page.text(MARGIN, y, 10.0, BOLD, "Notes");
        page.paragraph(MARGIN, y - 14.0, 9.0, 90, notes);
    }
    page.text(
        MARGIN,
        MARGIN,
        8.0,
        REGULAR,
        "Prices are valid until the date above and subject to stock availability.",
    );
    page.finish()
}

/// 100×150 mm label for the courier.
pub fn render_label(data: &LabelData<'_>) -> Result<Vec<u8>, ServiceError> {
    let order = data.order;
    let mut page = Page::new(LABEL);
    let pad = 5.0 * MM;
    let (w, h) = (page.width, page.height);
    page.rect(pad, pad, w - 2.0 * pad, h - 2.0 * pad, 1.5);

    let x = pad + 8.0;
    let mut y = h - pad - 20.0;
    page.text(x, y, 14.0, BOLD, order.shipping_type.as_deref().unwrap_or("SHIPPING"));
    page.text_right(w - pad - 8.0, y, 8.0, REGULAR, &invoice_number(order));
    y -= 12.0;
    page.line(pad, y, w - pad, y, 1.0);

    y -= 16.0;
    page.text(x, y, 8.0, BOLD, "TO");
    page.text(x, y - 16.0, 13.0, BOLD, &order.customer_name);
    y = page.paragraph(x, y - 30.0, 10.0, 38, &order.customer_address);
    page.text(x, y, 10.0, BOLD, &order.customer_phone);
    y -= 14.0;
    page.line(pad, y, w - pad, y, 1.0);

    y -= 16.0;
    page.text(x, y, 8.0, BOLD, "FROM");
    match data.store {
        Some(store) => {
            page.text(x, y - 13.0, 10.0, BOLD, &store.name);
            y -= 26.0;
            if let Some(address) = &store.address {
                y = page.paragraph(x, y, 8.0, 48, address);
            }
            if let Some(phone) = &store.phone {
                page.text(x, y, 8.0, REGULAR, phone);
                y -= 11.0;
            }
        }
        None => {
            page.text(x, y - 13.0, 10.0, BOLD, "Warehouse");
            y -= 26.0;
        }
    }
    y -= 4.0;
    page.line(pad, y, w - pad, y, 1.0);

    y -= 16.0;
    page.text(x, y, 8.0, BOLD, "CONTENTS");
    page.text(x, y - 13.0, 9.0, REGULAR, &data.sku.name);
    page.text(x, y - 25.0, 9.0, BOLD, &format!("SKU {}", data.sku.sku_code));
    page.finish()
}
