//! Sample MiniJinja HTML templates for testing and demonstration.
//!
//! Each template expects a JSON object; the expected keys are listed on the
//! function.

/// Invoice with a line-item table.
///
/// Keys: `name`, `number`, `items[] { nr, label, price }`, `total`.
pub fn invoice_template() -> &'static str {
    r##"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <style>
        body { font-family: sans-serif; margin: 2cm; }
        table { width: 100%; border-collapse: collapse; }
        th, td { padding: 4px 8px; border-bottom: 1px solid #ccc; text-align: left; }
        .total { text-align: right; font-weight: bold; }
    </style>
</head>
<body>
    <h1>Invoice {{ number }}</h1>
    <p>Dear {{ name }},</p>
    <p>please find the details of your order below.</p>
    <table>
        <tr><th>No.</th><th>Description</th><th>Price</th></tr>
        {%- for item in items %}
        <tr><td>{{ item.nr }}</td><td>{{ item.label }}</td><td>{{ item.price }}</td></tr>
        {%- endfor %}
    </table>
    <p class="total">Total: {{ total }}</p>
</body>
</html>
"##
}

/// Business letter with sender and recipient blocks.
///
/// Keys: `sender { first_name, last_name, street, house_no, phone, email }`,
/// `to { title, name, street, house_no, postcode, city, salutation }`,
/// `services[] { nr, label, price }`, `order { date }`.
pub fn letter_template() -> &'static str {
    r##"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <style>
        body { font-family: serif; margin: 2.5cm 2cm; }
        .sender { font-size: 9pt; color: #555; }
        .recipient { margin: 1cm 0; }
    </style>
</head>
<body>
    <p class="sender">{{ sender.first_name }} {{ sender.last_name }} · {{ sender.street }} {{ sender.house_no }} · {{ sender.phone }} · {{ sender.email }}</p>
    <div class="recipient">
        <p>{{ to.title }} {{ to.name }}<br>{{ to.street }} {{ to.house_no }}<br>{{ to.postcode }} {{ to.city }}</p>
    </div>
    <p>Order of {{ order.date }}</p>
    <p>{{ to.salutation }},</p>
    <p>we hereby confirm the following services:</p>
    <ul>
    {%- for s in services %}
        <li>{{ s.nr }} {{ s.label }}: {{ s.price }}</li>
    {%- endfor %}
    </ul>
    <p>Kind regards<br>{{ sender.first_name }} {{ sender.last_name }}</p>
</body>
</html>
"##
}

/// Minimal template for unit testing.
pub fn minimal_template() -> &'static str {
    r#"<div><h1>{{ title }}</h1><p>{{ text }}</p></div>"#
}
