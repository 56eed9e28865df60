table! {
    coupons (id) {
        id -> Integer,
        title -> VarChar,
        enterprise_customer_uuid -> Uuid,
        enterprise_customer_name -> VarChar,
        enterprise_catalog_uuid -> Nullable<Uuid>,
        voucher_type -> VarChar,
        max_uses -> Integer,
        benefit_type -> VarChar,
        benefit_value -> Double,
        start_at -> Timestamptz,
        end_at -> Timestamptz,
        is_active -> Bool,
        notify_email -> Nullable<VarChar>,
        contract_discount_type -> Nullable<VarChar>,
        contract_discount_value -> Nullable<Double>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    vouchers (id) {
        id -> Integer,
        coupon_id -> Integer,
        code -> VarChar,
        num_orders -> Integer,
        created_at -> Timestamptz,
    }
}

/// diesel table for the assignment ledger
table! {
    offer_assignments (id) {
        id -> Integer,
        voucher_id -> Integer,
        code -> VarChar,
        user_email -> VarChar,
        status -> VarChar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

table! {
    voucher_applications (id) {
        id -> Integer,
        voucher_id -> Integer,
        user_email -> VarChar,
        order_number -> VarChar,
        created_at -> Timestamptz,
    }
}

table! {
    offer_assignment_email_templates (id) {
        id -> Integer,
        enterprise_customer_uuid -> Uuid,
        email_type -> VarChar,
        email_greeting -> VarChar,
        email_closing -> VarChar,
        active -> Bool,
        created_at -> Timestamptz,
    }
}

table! {
    payment_transactions (id) {
        id -> Integer,
        txn_id -> VarChar,
        user_email -> VarChar,
        order_number -> VarChar,
        amount -> BigInt,
        currency -> VarChar,
        status -> VarChar,
        gateway_order_id -> VarChar,
        gateway_payment_id -> Nullable<VarChar>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

joinable!(vouchers -> coupons (coupon_id));
joinable!(offer_assignments -> vouchers (voucher_id));
joinable!(voucher_applications -> vouchers (voucher_id));

allow_tables_to_appear_in_same_query!(coupons, vouchers, offer_assignments, voucher_applications);
