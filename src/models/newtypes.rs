//! Typed identifiers shared by every layer

id_newtype!(UserId);
id_newtype!(CouponId);
id_newtype!(VoucherId);
id_newtype!(OfferAssignmentId);
id_newtype!(VoucherApplicationId);
id_newtype!(EmailTemplateId);
id_newtype!(PaymentTransactionId);
