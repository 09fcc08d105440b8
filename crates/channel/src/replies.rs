//! Customer- and admin-facing message texts.
//!
//! Every reply the bot sends is built here so wording stays in one place.

use rust_decimal::Decimal;

use warung_core::commands::Command;
use warung_core::domain::admin::{AdminAccess, AdminLevel, AdminPermission};
use warung_core::domain::cart::{Cart, CartLine};
use warung_core::domain::catalog::CategorySummary;
use warung_core::domain::order::{
    Order, OrderStatistics, OrderStatus, PaymentStatus, ShippingAddress,
};
use warung_core::domain::product::{Product, ProductDraft, ProductId};
use warung_core::flows::{InputRejection, ProductField, SelectionPurpose, SessionState};

const RULE: &str = "━━━━━━━━━━━━━━━━";
const SEARCH_LIMIT: usize = 10;
const HISTORY_LIMIT: usize = 10;
const OVERVIEW_LIMIT: usize = 5;

/// `Rp`-style amount with `.` thousands and `,` decimals, as the id-ID locale prints it.
pub fn format_rupiah(amount: Decimal) -> String {
    let rounded = amount.round_dp(2);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let absolute = rounded.abs();
    let whole = absolute.trunc();

    let digits = whole.normalize().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let fraction = (absolute - whole).normalize();
    if !fraction.is_zero() {
        let text = fraction.to_string();
        if let Some(decimals) = text.strip_prefix("0.") {
            grouped.push(',');
            grouped.push_str(decimals);
        }
    }

    if negative {
        format!("-{grouped}")
    } else {
        grouped
    }
}

fn rp(amount: Decimal) -> String {
    format!("Rp {}", format_rupiah(amount))
}

fn line_amounts(line: &CartLine) -> String {
    format!("{} x {} = {}", line.quantity, rp(line.unit_price), rp(line.line_subtotal))
}

pub fn status_emoji(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "⏳",
        OrderStatus::Confirmed => "✅",
        OrderStatus::Processing => "⚙️",
        OrderStatus::Shipped => "🚚",
        OrderStatus::Delivered => "📦",
        OrderStatus::Cancelled => "❌",
    }
}

pub fn status_text(status: OrderStatus) -> &'static str {
    match status {
        OrderStatus::Pending => "Menunggu Konfirmasi",
        OrderStatus::Confirmed => "Dikonfirmasi",
        OrderStatus::Processing => "Diproses",
        OrderStatus::Shipped => "Dikirim",
        OrderStatus::Delivered => "Diterima",
        OrderStatus::Cancelled => "Dibatalkan",
    }
}

fn payment_emoji(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Unpaid => "⏳",
        PaymentStatus::Paid => "✅",
        PaymentStatus::Refunded => "↩️",
    }
}

fn payment_text(status: PaymentStatus) -> &'static str {
    match status {
        PaymentStatus::Unpaid => "Belum Dibayar",
        PaymentStatus::Paid => "Lunas",
        PaymentStatus::Refunded => "Dikembalikan",
    }
}

// Catalog

pub fn catalog(products: &[&Product], category: Option<&str>) -> String {
    if products.is_empty() {
        return "❌ Tidak ada produk tersedia.".to_owned();
    }

    let mut message = match category {
        Some(category) => format!("📦 *Katalog Produk - {category}*\n\n"),
        None => "📦 *Katalog Produk*\n\n".to_owned(),
    };
    for (index, product) in products.iter().enumerate() {
        message.push_str(&product_listing(index, product));
    }
    message.push_str("\n💬 Ketik *PRODUK <kode>* untuk detail\n");
    message.push_str(&format!("Contoh: PRODUK {}", products[0].sku));
    message
}

fn product_listing(index: usize, product: &Product) -> String {
    format!(
        "{}. *{}*\n   💰 {}\n   📦 Stok: {}\n   📝 Kode: {}\n\n",
        index + 1,
        product.name,
        rp(product.price),
        product.stock,
        product.sku
    )
}

pub fn categories(categories: &[CategorySummary]) -> String {
    if categories.is_empty() {
        return "❌ Tidak ada kategori tersedia.".to_owned();
    }

    let mut message = "📂 *Kategori Produk*\n\n".to_owned();
    for (index, category) in categories.iter().enumerate() {
        message.push_str(&format!(
            "{}. {} ({} produk)\n",
            index + 1,
            category.name,
            category.product_count
        ));
    }
    message.push_str("\n💬 Ketik *KATEGORI <nama>* untuk melihat produk\n");
    message.push_str(&format!("Contoh: KATEGORI {}", categories[0].name));
    message
}

pub fn product_detail(product: &Product) -> String {
    let stock = if product.stock > 0 {
        format!("✅ Stok: {}", product.stock)
    } else {
        "❌ Stok Habis".to_owned()
    };
    let availability = if product.is_available { "" } else { "\n⚠️ Tidak Tersedia" };

    let mut message = format!(
        "🛍️ *{}*\n📦 SKU: {}\n💰 Harga: {}\n{stock}{availability}\n",
        product.name,
        product.sku,
        rp(product.price)
    );
    if !product.description.is_empty() {
        message.push_str(&format!("\n📝 {}\n", product.description));
    }
    if !product.variants.is_empty() {
        message.push_str("\n🎨 Variasi:\n");
        for variant in &product.variants {
            message.push_str(&format!("• {}: {}\n", variant.name, variant.options.join(", ")));
        }
    }
    message.push_str(&format!(
        "\n\n💬 Ketik *BELI {sku} <jumlah>* untuk menambah ke keranjang\nContoh: BELI {sku} 2",
        sku = product.sku
    ));
    message
}

pub fn product_not_found(sku: &str) -> String {
    format!("❌ Produk dengan kode *{sku}* tidak ditemukan.\n\nKetik *KATALOG* untuk melihat semua produk.")
}

/// Shorter variant used when a `BELI` names an unknown code.
pub fn unknown_product(sku: &str) -> String {
    format!("❌ Produk dengan kode *{sku}* tidak ditemukan.")
}

pub fn search_results(query: &str, products: &[&Product]) -> String {
    if products.is_empty() {
        return format!("🔍 Tidak ada produk yang cocok dengan \"*{query}*\"");
    }

    let mut message = format!("🔍 *Hasil Pencarian: {query}*\n\n");
    for (index, product) in products.iter().take(SEARCH_LIMIT).enumerate() {
        message.push_str(&product_listing(index, product));
    }
    if products.len() > SEARCH_LIMIT {
        message.push_str(&format!("\n... dan {} produk lainnya\n", products.len() - SEARCH_LIMIT));
    }
    message.push_str("\n💬 Ketik *PRODUK <kode>* untuk detail");
    message
}

// Cart

pub fn added_to_cart(product: &Product, quantity: u32) -> String {
    format!(
        "✅ *{}* ({quantity}x) berhasil ditambahkan ke keranjang!\n\n💬 Ketik *KERANJANG* untuk melihat keranjang\n💬 Ketik *CHECKOUT* untuk melanjutkan pemesanan",
        product.name
    )
}

pub fn cannot_purchase(product: &Product) -> String {
    format!(
        "❌ Maaf, produk *{}* tidak dapat dibeli.\n\nStok tersedia: {}",
        product.name, product.stock
    )
}

pub fn cart_summary(cart: &Cart) -> String {
    if cart.is_empty() {
        return "🛒 *Keranjang Kosong*\n\nBelum ada produk di keranjang.".to_owned();
    }

    let mut summary = "🛒 *Keranjang Belanja*\n\n".to_owned();
    for (index, line) in cart.lines.iter().enumerate() {
        summary.push_str(&format!("{}. *{}*\n", index + 1, line.name));
        if let Some(variant) = &line.variant {
            summary.push_str(&format!("   Variasi: {variant}\n"));
        }
        summary.push_str(&format!("   {}\n\n", line_amounts(line)));
    }
    summary.push_str(&format!(
        "{RULE}\n*Total: {}*\nTotal Item: {}\n",
        rp(cart.total()),
        cart.total_items()
    ));
    summary
}

pub fn view_cart(cart: &Cart) -> String {
    let mut message = cart_summary(cart);
    if !cart.is_empty() {
        message.push_str(
            "\n\n💬 Ketik *CHECKOUT* untuk melanjutkan\n💬 Ketik *HAPUS <no> [jumlah]* untuk hapus item",
        );
    }
    message
}

pub fn invalid_cart_line() -> String {
    "❌ Nomor item tidak valid.".to_owned()
}

pub fn removed_from_cart(line: &CartLine) -> String {
    format!(
        "✅ *{}* dihapus dari keranjang.\n\n💬 Ketik *KERANJANG* untuk melihat keranjang",
        line.name
    )
}

pub fn reduced_in_cart(line: &CartLine, removed: u32, remaining: u32) -> String {
    format!(
        "✅ {removed}x *{}* dihapus dari keranjang. Sisa: {remaining}\n\n💬 Ketik *KERANJANG* untuk melihat keranjang",
        line.name
    )
}

pub fn cart_cleared() -> String {
    "✅ Keranjang berhasil dikosongkan.".to_owned()
}

// Checkout

pub fn empty_cart() -> String {
    "❌ Keranjang Anda kosong.\n\n💬 Ketik *KATALOG* untuk mulai belanja.".to_owned()
}

/// Opens checkout. A returning customer is reminded of their default address.
pub fn checkout_intro(cart: &Cart, ask_name: bool, last_address: Option<&str>) -> String {
    let prompt = if ask_name {
        "👤 Silakan masukkan nama Anda:".to_owned()
    } else {
        match last_address {
            Some(street) => format!(
                "🏠 Alamat tersimpan: {street}\n\n📍 Silakan masukkan alamat pengiriman lengkap:"
            ),
            None => "📍 Silakan masukkan alamat pengiriman lengkap:".to_owned(),
        }
    };
    format!("{}\n\n{RULE}\n📝 *Proses Checkout*\n\n{prompt}", cart_summary(cart))
}

pub fn prompt_name() -> String {
    "👤 Silakan masukkan nama Anda:".to_owned()
}

pub fn prompt_address() -> String {
    "✅ Terima kasih!\n\n📍 Silakan masukkan alamat pengiriman lengkap:".to_owned()
}

pub fn checkout_confirmation(name: &str, address: &str, cart: &Cart) -> String {
    format!(
        "📋 *Konfirmasi Pesanan*\n\n👤 Nama: {name}\n📍 Alamat: {address}\n\n{}\n\n{RULE}\n✅ Ketik *YA* untuk konfirmasi\n❌ Ketik *BATAL* untuk membatalkan",
        cart_summary(cart)
    )
}

pub fn order_placed(order: &Order) -> String {
    format!(
        "✅ *Pesanan Berhasil Dibuat!*\n\n{}\n\n{RULE}\nTim kami akan segera menghubungi Anda untuk konfirmasi pembayaran dan pengiriman.\n\n💬 Ketik *CEK <order-id>* untuk melihat status pesanan",
        order_detail(order)
    )
}

/// The order is stored but follow-up bookkeeping failed.
pub fn order_placed_with_warning(order: &Order) -> String {
    format!(
        "⚠️ Pesanan *{id}* sudah tercatat, namun terjadi kendala saat memperbarui data Anda.\n\n💬 Ketik *CEK {id}* untuk melihat status pesanan",
        id = order.id
    )
}

pub fn checkout_cancelled() -> String {
    "❌ Pesanan dibatalkan. Keranjang Anda masih tersimpan.\n\n💬 Ketik *KERANJANG* untuk melihat keranjang".to_owned()
}

pub fn checkout_failed() -> String {
    "❌ Maaf, terjadi kesalahan saat memproses checkout. Silakan coba lagi.".to_owned()
}

pub fn stock_shortage(name: &str, available: u32) -> String {
    format!(
        "{}\n\nStok *{name}* tidak mencukupi (tersedia: {available}). Keranjang Anda masih tersimpan.",
        checkout_failed()
    )
}

pub fn confirm_again() -> String {
    "❓ Ketik *YA* untuk konfirmasi atau *BATAL* untuk membatalkan.".to_owned()
}

// Orders

fn format_address(address: &ShippingAddress) -> String {
    let mut formatted = String::new();
    if !address.street.is_empty() {
        formatted.push_str(&address.street);
        formatted.push('\n');
    }
    formatted.push_str(&address.city);
    if !address.province.is_empty() {
        formatted.push_str(&format!(", {}", address.province));
    }
    if !address.postal_code.is_empty() {
        formatted.push_str(&format!(" {}", address.postal_code));
    }
    formatted.push('\n');
    formatted
}

pub fn order_detail(order: &Order) -> String {
    let mut message = format!(
        "📋 *Detail Pesanan*\n\n🆔 Order ID: {}\n👤 Nama: {}\n📞 No. HP: {}\n📅 Tanggal: {}\n\n{RULE}\n\n🛍️ *Produk:*\n",
        order.id,
        order.customer_name,
        order.customer_phone,
        order.created_at.format("%d/%m/%Y %H:%M")
    );
    for (index, line) in order.items.iter().enumerate() {
        message.push_str(&format!("{}. {}\n", index + 1, line.name));
        if let Some(variant) = &line.variant {
            message.push_str(&format!("   Variasi: {variant}\n"));
        }
        message.push_str(&format!("   {}\n", line_amounts(line)));
    }

    message.push_str(&format!(
        "\n{RULE}\nSubtotal: {}\nOngkir: {}\n*Total: {}*\n",
        rp(order.subtotal),
        rp(order.shipping_cost),
        rp(order.total)
    ));
    message.push_str(&format!(
        "\n{RULE}\n📦 Status: {} {}\n💳 Pembayaran: {} {}\n",
        status_emoji(order.status),
        status_text(order.status),
        payment_emoji(order.payment_status),
        payment_text(order.payment_status)
    ));
    if let Some(tracking) = &order.tracking_number {
        message.push_str(&format!("🚚 Resi: {tracking}\n"));
    }

    let address = &order.shipping_address;
    if !(address.street.is_empty() && address.city.is_empty()) {
        message.push_str("\n📍 *Alamat Pengiriman:*\n");
        message.push_str(&format_address(address));
    }
    if let Some(notes) = &order.notes {
        message.push_str(&format!("\n📝 Catatan: {notes}\n"));
    }
    message
}

pub fn order_not_found(order_id: &str) -> String {
    format!("❌ Pesanan dengan ID *{order_id}* tidak ditemukan.")
}

pub fn order_access_denied() -> String {
    "❌ Anda tidak memiliki akses ke pesanan ini.".to_owned()
}

pub fn order_history(orders: &[Order]) -> String {
    if orders.is_empty() {
        return "📋 Anda belum memiliki riwayat pesanan.\n\n💬 Ketik *KATALOG* untuk mulai belanja."
            .to_owned();
    }

    let mut message = "📋 *Riwayat Pesanan Anda*\n\n".to_owned();
    for (index, order) in orders.iter().take(HISTORY_LIMIT).enumerate() {
        message.push_str(&format!(
            "{}. *{}*\n   {} {}\n   💰 {}\n   📅 {}\n\n",
            index + 1,
            order.id,
            status_emoji(order.status),
            status_text(order.status),
            rp(order.total),
            order.created_at.format("%d/%m/%Y")
        ));
    }
    if orders.len() > HISTORY_LIMIT {
        message.push_str(&format!("... dan {} pesanan lainnya\n\n", orders.len() - HISTORY_LIMIT));
    }
    message.push_str("💬 Ketik *CEK <order-id>* untuk detail pesanan");
    message
}

// Menus and vocabulary

pub fn help_menu() -> String {
    concat!(
        "🤖 *Menu Bot E-Commerce*\n\n",
        "📦 *Katalog & Produk*\n",
        "• KATALOG - Lihat semua produk\n",
        "• KATEGORI - Lihat kategori produk\n",
        "• PRODUK <kode> - Detail produk\n",
        "• CARI <kata kunci> - Cari produk\n\n",
        "🛒 *Keranjang & Pemesanan*\n",
        "• BELI <kode> <jumlah> - Tambah ke keranjang\n",
        "• KERANJANG - Lihat keranjang\n",
        "• HAPUS <no> [jumlah] - Hapus item dari keranjang\n",
        "• KOSONGKAN - Kosongkan keranjang\n",
        "• CHECKOUT - Proses pemesanan\n\n",
        "📋 *Pesanan*\n",
        "• CEK <order-id> - Cek status pesanan\n",
        "• RIWAYAT - Riwayat pesanan\n\n",
        "ℹ️ *Lainnya*\n",
        "• HELP - Tampilkan menu ini\n",
        "• INFO - Informasi toko\n\n",
        "💬 Contoh penggunaan:\n",
        "• BELI ABC123 2\n",
        "• PRODUK ABC123\n",
        "• CEK ORD-123ABC"
    )
    .to_owned()
}

pub fn store_info(store_name: &str, total_products: usize, total_categories: usize) -> String {
    format!(
        "ℹ️ *Informasi Toko*\n\nSelamat datang di {store_name}!\n\n📦 Total Produk: {total_products}\n📂 Kategori: {total_categories}\n\n💬 Ketik *HELP* untuk melihat menu\n💬 Ketik *KATALOG* untuk mulai belanja"
    )
}

pub fn greeting(store_name: &str) -> String {
    format!(
        "Halo! 👋 Selamat datang di {store_name}.\n\n💬 Ketik *HELP* untuk melihat menu\n💬 Ketik *KATALOG* untuk mulai belanja"
    )
}

pub fn thanks() -> String {
    "Sama-sama! 😊 Terima kasih telah berbelanja dengan kami.".to_owned()
}

pub fn not_understood() -> String {
    "Maaf, saya tidak mengerti perintah tersebut. 🤔\n\n💬 Ketik *HELP* untuk melihat menu yang tersedia."
        .to_owned()
}

pub fn generic_failure() -> String {
    "❌ Maaf, terjadi kesalahan. Silakan coba lagi.".to_owned()
}

/// Usage hint for a command that needs an argument.
pub fn usage(command: Command) -> Option<String> {
    let text = match command {
        Command::ProductDetail => {
            "💬 Ketik *PRODUK <kode>* untuk melihat detail produk\nContoh: PRODUK TSH001"
        }
        Command::Search => "💬 Ketik *CARI <kata kunci>* untuk mencari produk\nContoh: CARI kaos",
        Command::AddToCart => {
            "💬 Ketik *BELI <kode> <jumlah>* untuk menambah ke keranjang\nContoh: BELI TSH001 2"
        }
        Command::RemoveFromCart => {
            "💬 Ketik *HAPUS <nomor> [jumlah]* untuk menghapus item dari keranjang\nContoh: HAPUS 1"
        }
        Command::TrackOrder => {
            "💬 Ketik *CEK <order-id>* untuk mengecek status pesanan\nContoh: CEK ORD-123ABC"
        }
        _ => return None,
    };
    Some(text.to_owned())
}

/// Reply when a command's handler fails.
pub fn command_failure(command: Command) -> String {
    let action = match command {
        Command::Catalog => "menampilkan katalog",
        Command::Categories => "menampilkan kategori",
        Command::ProductDetail => "menampilkan detail produk",
        Command::Search => "mencari produk",
        Command::AddToCart => "menambahkan produk ke keranjang",
        Command::ViewCart => "menampilkan keranjang",
        Command::RemoveFromCart => "menghapus item",
        Command::ClearCart => "mengosongkan keranjang",
        Command::Checkout => "memproses checkout",
        Command::TrackOrder => "memeriksa pesanan",
        Command::OrderHistory => "menampilkan riwayat pesanan",
        Command::Help | Command::StoreInfo => return generic_failure(),
    };
    format!("❌ Maaf, terjadi kesalahan saat {action}.")
}

// Admin panel

pub fn access_denied() -> String {
    "❌ Akses ditolak. Anda bukan admin.".to_owned()
}

pub fn permission_denied() -> String {
    "❌ Anda tidak memiliki akses ke menu ini.\n\n💬 *Balas dengan angka pilihan*".to_owned()
}

pub fn admin_menu(access: &AdminAccess) -> String {
    let level = match access.level {
        AdminLevel::SuperAdmin => "Super Admin",
        AdminLevel::Admin | AdminLevel::User => "Admin",
    };
    let permissions = if access.level == AdminLevel::SuperAdmin {
        "all".to_owned()
    } else {
        access
            .permissions
            .iter()
            .map(|permission| match permission {
                AdminPermission::Products => "products",
                AdminPermission::Orders => "orders",
            })
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut menu = format!(
        "🔐 *ADMIN PANEL*\n\n👤 Admin: {level}\n🎯 Akses: {permissions}\n\n{RULE}\n\n*Pilih Menu:*\n\n"
    );
    if access.can(AdminPermission::Products) {
        menu.push_str("1️⃣ Manajemen Produk\n");
    }
    if access.can(AdminPermission::Orders) {
        menu.push_str("2️⃣ Ringkasan Pesanan\n");
    }
    menu.push_str("0️⃣ Keluar\n\n💬 *Balas dengan angka pilihan*");
    menu
}

pub fn order_overview(stats: &OrderStatistics, latest: &[Order]) -> String {
    let mut message = format!("📋 *RINGKASAN PESANAN*\n\nTotal Pesanan: {}\n", stats.total);
    for status in OrderStatus::ALL {
        message.push_str(&format!(
            "{} {}: {}\n",
            status_emoji(status),
            status_text(status),
            stats.count(status)
        ));
    }
    message.push_str(&format!("💰 Pendapatan (lunas): {}\n", rp(stats.revenue)));

    if !latest.is_empty() {
        message.push_str(&format!("\n{RULE}\n\n*Pesanan Terbaru:*\n\n"));
        for order in latest.iter().take(OVERVIEW_LIMIT) {
            message.push_str(&format!(
                "• {} - {} - {} {}\n",
                order.id,
                order.customer_name,
                status_emoji(order.status),
                rp(order.total)
            ));
        }
    }
    message.push_str("\n💬 *Balas dengan angka pilihan* (0 untuk keluar)");
    message
}

pub fn product_list(products: &[Product]) -> String {
    let mut list = format!("📦 *DAFTAR PRODUK*\n\nTotal Produk: {}\n\n", products.len());
    list.push_str(&numbered_products(products));
    list.trim_end().to_owned()
}

fn numbered_products(products: &[Product]) -> String {
    let mut text = String::new();
    for (index, product) in products.iter().enumerate() {
        text.push_str(&format!(
            "{}. {} (ID: {})\n   {} | Stok: {}\n\n",
            index + 1,
            product.name,
            product.id,
            rp(product.price),
            product.stock
        ));
    }
    text
}

pub fn product_menu(products: &[Product]) -> String {
    format!(
        "📦 *MANAJEMEN PRODUK*\n\nTotal Produk: {}\n\n{RULE}\n\n*Daftar Produk:*\n\n{}{RULE}\n\n*Menu:*\n\n1️⃣ Tambah Produk\n2️⃣ Ubah Produk\n3️⃣ Hapus Produk\n0️⃣ Kembali\n\n💬 *Balas dengan angka pilihan*",
        products.len(),
        numbered_products(products)
    )
}

pub fn product_selection(purpose: SelectionPurpose, products: &[Product]) -> String {
    let (title, verb) = match purpose {
        SelectionPurpose::Edit => ("✏️ *UBAH PRODUK*", "diubah"),
        SelectionPurpose::Delete => ("🗑️ *HAPUS PRODUK*", "dihapus"),
    };
    format!(
        "{title}\n\nPilih nomor produk yang ingin {verb}:\n\n{}💬 *Balas dengan nomor produk*",
        numbered_products(products)
    )
}

/// Prompt for one product field. When editing, `current` shows the value being replaced.
pub fn product_field_prompt(field: ProductField, current: Option<&Product>) -> String {
    let Some(product) = current else {
        return match field {
            ProductField::Name => "➕ *TAMBAH PRODUK BARU*\n\nSilakan isi data produk:\n\n🏷️ *Nama Produk:*\n(Contoh: Yamalube Racing 1L)".to_owned(),
            ProductField::Description => "📝 *Deskripsi Produk:*\n(Jelaskan detail produk)".to_owned(),
            ProductField::Price => "💰 *Harga Produk:*\n(Masukkan angka saja, contoh: 50000)".to_owned(),
            ProductField::Stock => "📊 *Stok Produk:*\n(Masukkan jumlah stok)".to_owned(),
            ProductField::Category => "📂 *Kategori Produk:*\n(Contoh: oli, ban, sparepart, aksesori)".to_owned(),
            ProductField::Image => "📷 *Gambar Produk:*\n\n✅ Kirim gambar produk sekarang\n❌ Atau ketik *SKIP* untuk lewati".to_owned(),
        };
    };

    let (label, old) = match field {
        ProductField::Name => {
            return format!(
                "✏️ *EDIT PRODUK: {name}*\n\nIsi data yang ingin diubah (ketik *SKIP* untuk lewati):\n\n🏷️ *Nama Produk:*\n\nLama: {name}\n\nMasukkan nama baru atau ketik *SKIP*:",
                name = product.name
            )
        }
        ProductField::Description => (
            "📝 *Deskripsi Produk:*",
            if product.description.is_empty() {
                "-".to_owned()
            } else {
                product.description.clone()
            },
        ),
        ProductField::Price => ("💰 *Harga Produk:*", rp(product.price)),
        ProductField::Stock => ("📊 *Stok Produk:*", product.stock.to_string()),
        ProductField::Category => ("📂 *Kategori Produk:*", product.category.clone()),
        ProductField::Image => {
            return "📷 *Gambar Produk:*\n\n✅ Kirim gambar baru\n❌ Atau ketik *SKIP* untuk lewati"
                .to_owned()
        }
    };
    format!("{label}\n\nLama: {old}\n\nMasukkan nilai baru atau ketik *SKIP*:")
}

pub fn product_created(id: &ProductId, sku: &str, draft: &ProductDraft) -> String {
    format!(
        "✅ *PRODUK BERHASIL DITAMBAHKAN*\n\n📦 ID: {id}\n📝 Kode: {sku}\n🏷️ Nama: {}\n💰 Harga: {}\n📊 Stok: {}\n📂 Kategori: {}\n\nProduk sudah tersedia di katalog!",
        draft.name,
        rp(draft.price),
        draft.stock,
        draft.category
    )
}

pub fn product_updated(product: &Product, changes: &[(&'static str, String)]) -> String {
    let mut changes_text = String::new();
    for (field, value) in changes {
        changes_text.push_str(&format!("• {field}: {value}\n"));
    }
    format!(
        "✅ *PRODUK BERHASIL DIUPDATE*\n\n📦 ID: {}\n🏷️ Nama: {}\n\n*Perubahan:*\n{changes_text}\nProduk sudah diupdate!",
        product.id, product.name
    )
}

pub fn no_product_changes() -> String {
    "ℹ️ Tidak ada perubahan pada produk".to_owned()
}

pub fn delete_confirmation(product: &Product) -> String {
    format!(
        "⚠️ *KONFIRMASI HAPUS PRODUK*\n\n📦 ID: {}\n🏷️ Nama: {}\n💰 Harga: {}\n\nYakin ingin menghapus produk ini?\n\n1️⃣ Ya, Hapus\n0️⃣ Batal",
        product.id,
        product.name,
        rp(product.price)
    )
}

pub fn product_deleted(product: &Product) -> String {
    format!(
        "✅ *PRODUK BERHASIL DIHAPUS*\n\n📦 ID: {}\n🏷️ Nama: {}\n\nProduk telah dihapus dari katalog!",
        product.id, product.name
    )
}

pub fn delete_cancelled() -> String {
    "❌ Penghapusan dibatalkan".to_owned()
}

pub fn panel_closed() -> String {
    "👋 Keluar dari Admin Panel".to_owned()
}

pub fn flow_cancelled() -> String {
    "❌ Proses dibatalkan. Anda keluar dari Admin Panel.".to_owned()
}

pub fn admin_action_failed(reason: &str) -> String {
    format!("❌ Gagal memproses produk: {reason}")
}

/// Re-prompt after rejected input. The session stays where it was.
pub fn rejection(state: SessionState, reason: InputRejection) -> String {
    match reason {
        InputRejection::EmptyText => match state {
            SessionState::CheckoutName => {
                format!("❌ Nama tidak boleh kosong.\n\n{}", prompt_name())
            }
            SessionState::CheckoutAddress => {
                "❌ Alamat tidak boleh kosong.\n\n📍 Silakan masukkan alamat pengiriman lengkap:"
                    .to_owned()
            }
            _ => "❌ Isian tidak boleh kosong!\n\nSilakan isi lagi:".to_owned(),
        },
        InputRejection::InvalidPrice => {
            "❌ Harga harus berupa angka positif!\n\nSilakan masukkan harga lagi:".to_owned()
        }
        InputRejection::InvalidStock => {
            "❌ Stok harus berupa angka!\n\nSilakan masukkan stok lagi:".to_owned()
        }
        InputRejection::InvalidSelection { max } => format!(
            "❌ Nomor tidak valid!\n\nSilakan pilih nomor produk yang benar (1-{max}):"
        ),
        InputRejection::UnknownOption => {
            "❌ Pilihan tidak valid.\n\n💬 *Balas dengan angka pilihan*".to_owned()
        }
        InputRejection::ExpectedConfirmation => confirm_again(),
        InputRejection::MissingImage => {
            "⏳ Menunggu gambar...\n\nSilakan kirim gambar atau ketik *SKIP*".to_owned()
        }
        InputRejection::EmptyCatalog => {
            "❌ Tidak ada produk di katalog.\n\n💬 *Balas dengan angka pilihan*".to_owned()
        }
        InputRejection::MissingSessionData => generic_failure(),
    }
}
