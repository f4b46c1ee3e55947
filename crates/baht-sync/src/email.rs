//! Invoice summary sent as the body of `sendInvoiceEmail`.
//!
//! The script turns this HTML into the PDF attachment, so it carries the
//! full legal content of the invoice: seller, buyer, lines, totals and the
//! amount in Thai words.

use baht_core::format::display_invoice_date;
use baht_core::money::{format_currency, line_amount_before_vat};
use baht_core::{BranchType, CompanyProfile, Invoice, VatRate};

use crate::protocol::EmailPayload;

/// Builds the email request for `invoice`.
pub fn email_payload(
    invoice: &Invoice,
    company: &CompanyProfile,
    recipient: &str,
    rate: VatRate,
) -> EmailPayload {
    EmailPayload {
        customer_email: recipient.trim().to_string(),
        customer_name: invoice.customer_name.clone(),
        invoice_number: invoice.invoice_number.clone(),
        invoice_html: render_invoice_html(invoice, company, rate),
        company_name: company.name.clone(),
        total: invoice.total,
    }
}

/// Renders a self-contained HTML tax invoice.
pub fn render_invoice_html(invoice: &Invoice, company: &CompanyProfile, rate: VatRate) -> String {
    let mut rows = String::new();
    for (idx, item) in invoice.items.iter().enumerate() {
        rows.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td style=\"text-align:right\">{}</td><td style=\"text-align:right\">{}</td></tr>",
            idx + 1,
            escape(&item.description),
            item.quantity,
            format_currency(line_amount_before_vat(item, rate)),
        ));
    }

    format!(
        r#"<div style="font-family:'Prompt',sans-serif;color:#333">
<h1 style="font-size:14px;color:#1a5490">ใบกำกับภาษี / ใบเสร็จรับเงิน (Tax Invoice / Receipt)</h1>
<p><strong>{company}</strong><br>{company_address}<br>เลขประจำตัวผู้เสียภาษี {company_tax_id} {company_branch}</p>
<p>ชื่อผู้รับบริการ: {customer}<br>ที่อยู่: {customer_address}<br>เลขประจำตัวผู้เสียภาษี: {customer_tax_id} {customer_branch}</p>
<p>วันที่: {date}<br>เลขที่: {number}</p>
<table style="width:100%;border-collapse:collapse">
<tr><th>ลำดับ</th><th>รายละเอียด</th><th>จำนวน</th><th>จำนวนเงิน</th></tr>
{rows}
</table>
<p>ยอดก่อน VAT {subtotal}<br>VAT {vat_rate}% {vat}<br><strong>ยอดรวมทั้งสิ้น {total}</strong></p>
<p>({thai_text})</p>
</div>"#,
        company = escape(&company.name),
        company_address = escape(&company.address),
        company_tax_id = escape(company.tax_id.as_str()),
        company_branch = branch_label(company.branch_type, &company.branch_number),
        customer = escape(&invoice.customer_name),
        customer_address = escape(&invoice.customer_address),
        customer_tax_id = escape(invoice.customer_tax_id.as_str()),
        customer_branch = branch_label(invoice.branch_type, &invoice.branch_number),
        date = display_invoice_date(&invoice.date),
        number = escape(&invoice.invoice_number),
        rows = rows,
        subtotal = format_currency(invoice.subtotal),
        vat_rate = rate.percent(),
        vat = format_currency(invoice.vat),
        total = format_currency(invoice.total),
        thai_text = escape(&invoice.thai_text),
    )
}

fn branch_label(branch_type: BranchType, number: &str) -> String {
    match branch_type {
        BranchType::Hq => "สำนักงานใหญ่".to_string(),
        BranchType::Branch => format!("สาขา {}", escape(number)),
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
