use super::*;

#[test]
fn test_page_request_default() {
    let request = PageRequest::default();
    assert_eq!(request.page, 1);
    assert_eq!(request.per_page, 20);
}

#[test]
fn test_page_request_offset() {
    let request = PageRequest { page: 1, per_page: 20 };
    assert_eq!(request.offset(), 0);

    let request = PageRequest { page: 3, per_page: 25 };
    assert_eq!(request.offset(), 50);
}

#[test]
fn test_normalized_clamps_bounds() {
    let request = PageRequest { page: 0, per_page: 500 }.normalized();
    assert_eq!(request.page, 1);
    assert_eq!(request.per_page, MAX_PER_PAGE);

    let request = PageRequest { page: 4, per_page: 0 }.normalized();
    assert_eq!(request.page, 4);
    assert_eq!(request.per_page, 1);
}

#[test]
fn test_page_response_total_pages() {
    let request = PageRequest { page: 1, per_page: 10 };

    assert_eq!(PageResponse::new(vec![1, 2, 3], request, 3).meta.total_pages, 1);
    assert_eq!(PageResponse::<i32>::new(vec![], request, 0).meta.total_pages, 1);
    assert_eq!(PageResponse::<i32>::new(vec![], request, 21).meta.total_pages, 3);
}

#[test]
fn test_page_response_map_keeps_meta() {
    let request = PageRequest { page: 2, per_page: 2 };
    let response = PageResponse::new(vec![1, 2], request, 4).map(|n| n * 10);

    assert_eq!(response.data, vec![10, 20]);
    assert_eq!(response.meta.page, 2);
    assert_eq!(response.meta.total, 4);
}
