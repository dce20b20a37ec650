/// 总页数，至少为 1
pub fn total_pages(len: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    len.div_ceil(page_size).max(1)
}

/// 取第 `page` 页（从 1 开始），offset = (page - 1) × page_size
pub fn page_slice<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    if page_size == 0 {
        return items;
    }
    let offset = page.max(1).saturating_sub(1).saturating_mul(page_size);
    if offset >= items.len() {
        return &[];
    }
    let end = (offset + page_size).min(items.len());
    &items[offset..end]
}
