//! Localized user-facing messages.
//!
//! Error responses and pages carry message keys; the key is resolved to text
//! for the caller's locale at the boundary. Unknown keys resolve to themselves.

use std::str::FromStr;

/// Message key for a product id that does not exist.
pub const PRODUCT_NOT_FOUND: &str = "catalogue.errors.product.not_found";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    En,
    Ru,
}

impl Locale {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ru => "ru",
        }
    }

    /// Match a BCP 47 tag by its primary subtag (`ru-RU` → `Ru`).
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.trim().split(['-', '_']).next()?;
        if primary.eq_ignore_ascii_case("en") {
            Some(Locale::En)
        } else if primary.eq_ignore_ascii_case("ru") {
            Some(Locale::Ru)
        } else {
            None
        }
    }

    /// Pick the highest-weighted supported locale from an `Accept-Language`
    /// header value. Ties keep header order.
    #[must_use]
    pub fn from_accept_language(header: &str) -> Option<Self> {
        let mut candidates: Vec<(f32, Locale)> = header
            .split(',')
            .filter_map(|item| {
                let mut parts = item.split(';');
                let locale = Locale::from_tag(parts.next()?)?;
                let weight = parts
                    .find_map(|p| p.trim().strip_prefix("q="))
                    .and_then(|q| q.trim().parse::<f32>().ok())
                    .unwrap_or(1.0);
                (weight > 0.0).then_some((weight, locale))
            })
            .collect();
        candidates.sort_by(|a, b| b.0.total_cmp(&a.0));
        candidates.first().map(|(_, locale)| *locale)
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Locale::from_tag(s).ok_or_else(|| format!("unsupported locale '{s}', expected en or ru"))
    }
}

// (key, en, ru)
const BUNDLE: &[(&str, &str, &str)] = &[
    (
        "catalogue.products.create.errors.title_is_null",
        "Product title must be provided",
        "Название товара должно быть указано",
    ),
    (
        "catalogue.products.create.errors.title_is_blank",
        "Product title must not be blank",
        "Название товара не может быть пустым",
    ),
    (
        "catalogue.products.create.errors.title_size_is_invalid",
        "Product title must be between 3 and 50 characters",
        "Название товара должно быть от 3 до 50 символов",
    ),
    (
        "catalogue.products.create.errors.details_size_is_invalid",
        "Product details must not exceed 1000 characters",
        "Описание товара должно быть не больше 1000 символов",
    ),
    (
        "catalogue.products.update.errors.title_is_null",
        "Product title must be provided",
        "Название товара должно быть указано",
    ),
    (
        "catalogue.products.update.errors.title_is_blank",
        "Product title must not be blank",
        "Название товара не может быть пустым",
    ),
    (
        "catalogue.products.update.errors.title_size_is_invalid",
        "Product title must be between 3 and 50 characters",
        "Название товара должно быть от 3 до 50 символов",
    ),
    (
        "catalogue.products.update.errors.details_size_is_invalid",
        "Product details must not exceed 1000 characters",
        "Описание товара должно быть не больше 1000 символов",
    ),
    (PRODUCT_NOT_FOUND, "Product not found", "Товар не найден"),
    (
        "errors.request.malformed",
        "The request body could not be read",
        "Не удалось прочитать тело запроса",
    ),
    (
        "errors.internal",
        "An unexpected error occurred",
        "Произошла непредвиденная ошибка",
    ),
    (
        "errors.upstream.unavailable",
        "The catalogue service is unavailable",
        "Сервис каталога недоступен",
    ),
    (
        "errors.access_denied",
        "Access denied",
        "Доступ запрещён",
    ),
    (
        "errors.login.invalid_credentials",
        "Invalid username or password",
        "Неверное имя пользователя или пароль",
    ),
    // manager page labels
    ("manager.products.list.title", "Products", "Товары"),
    ("manager.products.list.search", "Search", "Найти"),
    ("manager.products.list.new", "New product", "Новый товар"),
    ("manager.products.new.title", "New product", "Новый товар"),
    ("manager.products.edit.title", "Edit product", "Редактирование товара"),
    ("manager.products.form.title", "Title", "Название"),
    ("manager.products.form.details", "Details", "Описание"),
    ("manager.products.form.create", "Create", "Создать"),
    ("manager.products.form.save", "Save", "Сохранить"),
    ("manager.products.product.edit", "Edit", "Изменить"),
    ("manager.products.product.delete", "Delete", "Удалить"),
    ("manager.nav.back_to_list", "Back to list", "К списку товаров"),
    ("manager.nav.sign_out", "Sign out", "Выйти"),
    ("manager.login.title", "Sign in", "Вход"),
    ("manager.login.username", "Username", "Имя пользователя"),
    ("manager.login.password", "Password", "Пароль"),
    ("manager.login.submit", "Sign in", "Войти"),
];

/// Resolve `key` for `locale`, falling back to the key itself.
#[must_use]
pub fn message(key: &str, locale: Locale) -> &str {
    BUNDLE
        .iter()
        .find(|(k, _, _)| *k == key)
        .map_or(key, |&(_, en, ru)| match locale {
            Locale::En => en,
            Locale::Ru => ru,
        })
}
